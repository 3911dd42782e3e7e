//! End-to-end behavior of a store backed by files on disk

use serde_json::Value;
use tasklist_core::storage::{FileStorage, KeyValueStorage, TaskPersistence};
use tasklist_core::sync::{Autosave, LoadOutcome};
use tasklist_core::task::{StorePhase, TaskStats, TaskStore};
use tasklist_core::{Error, StoreConfig};
use tempfile::TempDir;

fn config_in(dir: &TempDir) -> StoreConfig {
    StoreConfig {
        data_dir: dir.path().to_path_buf(),
        ..StoreConfig::default()
    }
}

#[tokio::test]
async fn buy_milk_scenario() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_in(&temp_dir);

    let autosave = config.start().await;
    assert_eq!(autosave.load_outcome(), &LoadOutcome::Absent);
    assert_eq!(autosave.store().phase(), StorePhase::Ready);
    let store = autosave.store().clone();

    let task = store.create("Buy milk", "").unwrap();
    assert_eq!(
        store.stats(),
        TaskStats {
            total: 1,
            completed: 0,
            pending: 1
        }
    );

    assert!(store.toggle_completed(task.id.as_str()));
    assert_eq!(
        store.stats(),
        TaskStats {
            total: 1,
            completed: 1,
            pending: 0
        }
    );

    autosave.shutdown().await;

    let raw = FileStorage::new(temp_dir.path())
        .get("tasks")
        .await
        .unwrap()
        .unwrap();
    let value: Value = serde_json::from_slice(&raw).unwrap();
    let records = value["tasks"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], task.id.as_str());
    assert_eq!(records[0]["title"], "Buy milk");
    assert_eq!(records[0]["completed"], true);
}

#[tokio::test]
async fn state_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_in(&temp_dir);

    let expected = {
        let autosave = config.start().await;
        let store = autosave.store();
        let a = store.create("Walk dog", "around the park").unwrap();
        let b = store.create("Pay rent", "").unwrap();
        let c = store.create("Call mom", "").unwrap();
        store.toggle_completed(b.id.as_str());
        store.edit(a.id.as_str(), "Walk the dog", "twice").unwrap();
        store.delete(c.id.as_str());

        let tasks = store.tasks();
        autosave.shutdown().await;
        tasks
    };

    let autosave = config.start().await;
    assert_eq!(
        autosave.load_outcome(),
        &LoadOutcome::Loaded { count: 2 }
    );
    assert_eq!(autosave.store().tasks(), expected);
    assert_eq!(autosave.store().tasks()[1].title, "Walk the dog");
    assert!(autosave.store().tasks()[0].completed);
}

#[tokio::test]
async fn rejected_input_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_in(&temp_dir);
    let autosave = config.start().await;
    let store = autosave.store();

    assert!(matches!(store.create("   ", "desc"), Err(Error::Validation(_))));
    autosave.flush().await;

    assert!(!temp_dir.path().join("tasks.json").exists());
    assert!(store.tasks().is_empty());
}

#[tokio::test]
async fn reads_data_from_the_spanish_build() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileStorage::new(temp_dir.path());
    let legacy = r#"[
        {"id":"1709290800000","titulo":"Comprar pan","descripcion":"integral","completada":false,"creadaEn":"2024-03-01T11:00:00.000Z"},
        {"id":"1709287200000","titulo":"Lavar ropa","descripcion":"","completada":true,"creadaEn":"2024-03-01T10:00:00.000Z"}
    ]"#;
    storage.set("tareas", legacy.as_bytes().to_vec()).await.unwrap();

    let autosave = Autosave::start(TaskStore::new(), TaskPersistence::new(storage)).await;
    let store = autosave.store();
    assert_eq!(autosave.load_outcome(), &LoadOutcome::Loaded { count: 2 });
    assert_eq!(store.tasks()[0].title, "Comprar pan");
    assert_eq!(store.stats().completed, 1);

    store.toggle_completed("1709290800000");
    autosave.flush().await;

    let reloaded = TaskPersistence::new(FileStorage::new(temp_dir.path()))
        .load()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded, store.tasks());
    assert!(!temp_dir.path().join("tareas.json").exists());
}
