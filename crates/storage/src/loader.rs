//! Event-driven blueprint loading and saving.
//!
//! Loads read and decode on the `AsyncComputeTaskPool`; finished tasks are
//! polled once per frame and land in a [`BlueprintCache`] keyed by content
//! id, so the same file loaded twice (or two copies of it) shares one
//! `Arc<Blueprint>`. Saves are small and written synchronously.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bevy::prelude::*;
use bevy::tasks::{block_on, AsyncComputeTaskPool, Task};

use blueprint::Blueprint;

use crate::codec::{decode_blueprint, save_to_file};
use crate::content_id::ContentId;
use crate::storage_error::StorageError;

// =============================================================================
// Events
// =============================================================================

#[derive(Event, Debug, Clone)]
pub struct LoadBlueprint {
    pub path: PathBuf,
}

#[derive(Event, Debug, Clone)]
pub struct SaveBlueprint {
    pub blueprint: Arc<Blueprint>,
    pub path: PathBuf,
}

#[derive(Event, Debug, Clone)]
pub struct BlueprintLoaded {
    pub path: PathBuf,
    pub id: ContentId,
    pub blueprint: Arc<Blueprint>,
}

#[derive(Event, Debug, Clone)]
pub struct BlueprintLoadFailed {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Event, Debug, Clone)]
pub struct BlueprintSaved {
    pub path: PathBuf,
    pub id: ContentId,
}

// =============================================================================
// Cache
// =============================================================================

/// Decoded blueprints by content id, plus the id each path last resolved to.
#[derive(Resource, Default, Debug)]
pub struct BlueprintCache {
    by_id: HashMap<ContentId, Arc<Blueprint>>,
    by_path: HashMap<PathBuf, ContentId>,
}

impl BlueprintCache {
    pub fn get(&self, id: ContentId) -> Option<Arc<Blueprint>> {
        self.by_id.get(&id).cloned()
    }

    pub fn get_path(&self, path: &Path) -> Option<Arc<Blueprint>> {
        self.by_path.get(path).and_then(|id| self.get(*id))
    }

    pub fn id_for_path(&self, path: &Path) -> Option<ContentId> {
        self.by_path.get(path).copied()
    }

    /// Record `blueprint` under `id`. An already cached blueprint with the
    /// same id wins and is returned instead. The id `path` held before is
    /// dropped once no path refers to it.
    pub fn insert(&mut self, path: PathBuf, id: ContentId, blueprint: Arc<Blueprint>) -> Arc<Blueprint> {
        if let Some(old) = self.by_path.insert(path, id) {
            if old != id && !self.by_path.values().any(|v| *v == old) {
                self.by_id.remove(&old);
            }
        }
        Arc::clone(self.by_id.entry(id).or_insert(blueprint))
    }

    /// Number of distinct blueprints held.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_path.clear();
    }
}

// =============================================================================
// Async loads
// =============================================================================

struct PendingLoad {
    path: PathBuf,
    task: Task<Result<(ContentId, Blueprint), StorageError>>,
}

/// Loads still running on the task pool.
#[derive(Resource, Default)]
pub struct PendingLoads {
    tasks: Vec<PendingLoad>,
}

impl PendingLoads {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

fn read_and_decode(path: &Path) -> Result<(ContentId, Blueprint), StorageError> {
    let bytes = std::fs::read(path)?;
    let id = ContentId::of_bytes(&bytes);
    Ok((id, decode_blueprint(&bytes)?))
}

fn dispatch_loads(mut requests: EventReader<LoadBlueprint>, mut pending: ResMut<PendingLoads>) {
    let pool = AsyncComputeTaskPool::get();
    for request in requests.read() {
        let path = request.path.clone();
        let task_path = path.clone();
        let task = pool.spawn(async move { read_and_decode(&task_path) });
        pending.tasks.push(PendingLoad { path, task });
    }
}

fn collect_loads(
    mut pending: ResMut<PendingLoads>,
    mut cache: ResMut<BlueprintCache>,
    mut loaded: EventWriter<BlueprintLoaded>,
    mut failed: EventWriter<BlueprintLoadFailed>,
) {
    pending.tasks.retain_mut(|load| {
        let Some(result) = block_on(futures_lite::future::poll_once(&mut load.task)) else {
            return true;
        };
        match result {
            Ok((id, bp)) => {
                let blueprint = cache.insert(load.path.clone(), id, Arc::new(bp));
                info!(
                    "Loaded blueprint '{}' from {} ({id})",
                    blueprint.name(),
                    load.path.display()
                );
                loaded.send(BlueprintLoaded {
                    path: load.path.clone(),
                    id,
                    blueprint,
                });
            }
            Err(e) => {
                warn!("Failed to load blueprint {}: {e}", load.path.display());
                failed.send(BlueprintLoadFailed {
                    path: load.path.clone(),
                    error: e.to_string(),
                });
            }
        }
        false
    });
}

fn write_saves(
    mut requests: EventReader<SaveBlueprint>,
    mut cache: ResMut<BlueprintCache>,
    mut saved: EventWriter<BlueprintSaved>,
) {
    for request in requests.read() {
        match save_to_file(&request.blueprint, &request.path) {
            Ok(id) => {
                cache.insert(request.path.clone(), id, Arc::clone(&request.blueprint));
                info!(
                    "Saved blueprint '{}' to {}",
                    request.blueprint.name(),
                    request.path.display()
                );
                saved.send(BlueprintSaved {
                    path: request.path.clone(),
                    id,
                });
            }
            Err(e) => {
                error!("Failed to save blueprint to {}: {e}", request.path.display());
            }
        }
    }
}

// =============================================================================
// Plugin
// =============================================================================

pub struct StoragePlugin;

impl Plugin for StoragePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<BlueprintCache>()
            .init_resource::<PendingLoads>()
            .add_event::<LoadBlueprint>()
            .add_event::<SaveBlueprint>()
            .add_event::<BlueprintLoaded>()
            .add_event::<BlueprintLoadFailed>()
            .add_event::<BlueprintSaved>()
            .add_systems(Update, (write_saves, dispatch_loads, collect_loads).chain());
    }
}
