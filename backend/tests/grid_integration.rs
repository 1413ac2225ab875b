//! Grid layer end to end: patients from the repository, a controller over
//! them, and layout settings persisted between sessions.

use std::sync::Arc;
use std::time::Duration;

use valyanmed::db::repositories::LocalRepository;
use valyanmed::grid::{
    settings_key, FileSettingsStorage, GridController, GridData, GridSettings,
    GridSettingsService, InMemorySource, SettingsStorage,
};
use valyanmed::models::{Patient, PatientInput};
use valyanmed::paging::SortDirection;
use valyanmed::services::patients;

async fn registered_patients() -> Vec<Patient> {
    let repo = LocalRepository::new();
    let people = [
        ("1850312400012", "Popescu", "Iasi"),
        ("1850312400020", "Ionescu", "Cluj"),
        ("1850312400039", "Avram", "Iasi"),
        ("2850312400065", "Marin", "Brasov"),
    ];
    for (cnp, last_name, city) in people {
        let gender = if cnp.starts_with('2') { "female" } else { "male" };
        let input: PatientInput = serde_json::from_value(serde_json::json!({
            "cnp": cnp,
            "firstName": "Test",
            "lastName": last_name,
            "dateOfBirth": "1985-03-12",
            "gender": gender,
            "city": city
        }))
        .unwrap();
        patients::create_patient(&repo, &input).await.unwrap();
    }
    patients::list_patients(&repo, false).await.unwrap()
}

fn last_names(data: &GridData<Patient>) -> Vec<String> {
    match data {
        GridData::Page(page) => page.items.iter().map(|p| p.last_name.clone()).collect(),
        other => panic!("expected a page, got {:?}", other),
    }
}

#[tokio::test]
async fn test_layout_survives_a_new_session() {
    let dir = tempfile::tempdir().unwrap();
    let service = GridSettingsService::new(Arc::new(FileSettingsStorage::new(dir.path())));

    let settings = service.load("patients");
    assert_eq!(settings, GridSettings::default());

    let grid = GridController::new(InMemorySource::new(registered_patients().await), &settings);
    assert!(grid.refresh().await);
    assert_eq!(last_names(&grid.view().data).len(), 4);

    grid.toggle_sort("lastName").await;
    grid.toggle_sort("lastName").await;
    grid.set_page_size(2).await;
    assert_eq!(last_names(&grid.view().data), vec!["Popescu", "Marin"]);
    assert!(service.save("patients", &grid.settings(&settings)));

    // a fresh service reads the file, not a cache
    let reopened = GridSettingsService::new(Arc::new(FileSettingsStorage::new(dir.path())));
    let restored = reopened.load("patients");
    assert_eq!(restored.sort_column.as_deref(), Some("lastName"));
    assert_eq!(restored.sort_direction, SortDirection::Desc);
    assert_eq!(restored.page_size, 2);

    let grid = GridController::new(InMemorySource::new(registered_patients().await), &restored);
    grid.refresh().await;
    assert_eq!(last_names(&grid.view().data), vec!["Popescu", "Marin"]);
}

#[tokio::test]
async fn test_unwritable_storage_keeps_settings_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-directory");
    std::fs::write(&blocker, b"x").unwrap();

    let storage = Arc::new(FileSettingsStorage::new(blocker.join("grids")));
    let service = GridSettingsService::new(storage.clone());

    let settings = GridSettings {
        group_by: Some("city".to_string()),
        page_size: 50,
        ..Default::default()
    };
    assert!(!service.save("patients", &settings));
    assert!(storage.get(&settings_key("patients")).is_err());

    let loaded = service.load("patients");
    assert_eq!(loaded.group_by.as_deref(), Some("city"));
    assert_eq!(loaded.page_size, 50);

    service.reset("patients");
    assert_eq!(service.load("patients"), GridSettings::default());
}

#[tokio::test]
async fn test_grouped_grid_from_saved_settings() {
    let settings = GridSettings {
        group_by: Some("city".to_string()),
        ..Default::default()
    };
    let grid = GridController::new(InMemorySource::new(registered_patients().await), &settings)
        .with_debounce(Duration::from_millis(5));
    grid.refresh().await;

    match grid.view().data {
        GridData::Groups(groups) => {
            let keys: Vec<_> = groups.groups.iter().map(|g| g.key.as_str()).collect();
            assert_eq!(keys, vec!["Brasov", "Cluj", "Iasi"]);
        }
        other => panic!("expected groups, got {:?}", other),
    }

    let pending = grid.search("iasi").unwrap();
    assert!(pending.await.unwrap());
    match grid.view().data {
        GridData::Groups(groups) => {
            assert_eq!(groups.total_count, 2);
            assert_eq!(groups.groups.len(), 1);
        }
        other => panic!("expected groups, got {:?}", other),
    }
    grid.dispose();
}
