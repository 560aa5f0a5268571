// libs/doctor-cell/tests/integration_test.rs
// Service-level tests against in-memory SQLite.

use assert_matches::assert_matches;

use doctor_cell::models::{
    AffiliationStatus, CreateDoctorRequest, DoctorError, DoctorSearchQuery, ImportMode, LocationTier, MatchCriteria,
    UpdateDoctorRequest,
};
use doctor_cell::services::locations::LocationSelection;
use doctor_cell::services::specialties;
use doctor_cell::services::{AffiliationService, DoctorCsvService, DoctorMatchingService, DoctorService};
use shared_database::migrations::DOCTORS_MIGRATIONS;
use shared_database::DbPool;

async fn pool() -> sqlx::SqlitePool {
    let db = DbPool::in_memory().await.unwrap();
    db.migrate(DOCTORS_MIGRATIONS).await.unwrap();
    db.pool().clone()
}

fn doctor(name: &str, specialty: &str, address: &str, priority: i64) -> CreateDoctorRequest {
    CreateDoctorRequest {
        name_en: Some(name.to_string()),
        specialty_en: Some(specialty.to_string()),
        address_en: Some(address.to_string()),
        priority_flag: Some(priority),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_matching_over_the_directory() {
    let pool = pool().await;
    let service = DoctorService::from_pool(pool.clone());

    service.create_doctor(doctor("Far", "Cardiology", "Tuen Mun", 5)).await.unwrap();
    service.create_doctor(doctor("Near", "Cardiology", "Argyle Street, Mong Kok", 0)).await.unwrap();
    service.create_doctor(doctor("GP", "General Practitioner", "Jordan", 0)).await.unwrap();

    let criteria = MatchCriteria {
        specialties: specialties::resolve_all(["Cardiology"]),
        location: LocationSelection {
            area: Some("Mong Kok".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    let matches = DoctorMatchingService::from_pool(pool)
        .find_matching_doctors(&criteria)
        .await
        .unwrap();

    let names: Vec<_> = matches.iter().map(|m| m.doctor.name_en.clone().unwrap()).collect();
    assert_eq!(names, vec!["Near", "Far", "GP"]);
    assert_eq!(matches[0].location_tier, LocationTier::Area);
    assert!(matches[2].is_fallback);
    assert_eq!(matches[2].location_tier, LocationTier::District);
}

#[tokio::test]
async fn test_search_orders_by_priority() {
    let pool = pool().await;
    let service = DoctorService::from_pool(pool);

    service.create_doctor(doctor("Low", "Neurology", "Central", 0)).await.unwrap();
    service.create_doctor(doctor("High", "Neurology", "Central", 9)).await.unwrap();

    let page = service
        .search_doctors(&DoctorSearchQuery {
            q: Some("central".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(page.total, 2);
    assert_eq!(page.items[0].name_en.as_deref(), Some("High"));
}

#[tokio::test]
async fn test_set_priority_validates_range() {
    let pool = pool().await;
    let service = DoctorService::from_pool(pool);
    let id = service.create_doctor(doctor("Dr. Yip", "Psychiatry", "Tai Po", 0)).await.unwrap().id;

    assert_matches!(service.set_priority(id, 11).await, Err(DoctorError::Validation(_)));
    assert_eq!(service.set_priority(id, 7).await.unwrap().priority_flag, 7);
    assert_matches!(service.set_priority(404, 1).await, Err(DoctorError::NotFound(404)));
}

#[tokio::test]
async fn test_update_cannot_clear_required_fields() {
    let pool = pool().await;
    let service = DoctorService::from_pool(pool);
    let id = service.create_doctor(doctor("Dr A", "Cardiology", "Central", 0)).await.unwrap().id;

    let cleared = UpdateDoctorRequest {
        name_en: Some(String::new()),
        specialty_en: Some(String::new()),
        ..Default::default()
    };
    assert_matches!(service.update_doctor(id, cleared).await, Err(DoctorError::Validation(_)));

    let unchanged = service.get_doctor(id).await.unwrap();
    assert_eq!(unchanged.name_en.as_deref(), Some("Dr A"));
    assert_eq!(unchanged.specialty_en.as_deref(), Some("Cardiology"));

    // Clearing one language is fine while the other remains.
    let swapped = UpdateDoctorRequest {
        name_en: Some(String::new()),
        name_zh: Some("甲醫生".to_string()),
        ..Default::default()
    };
    let updated = service.update_doctor(id, swapped).await.unwrap();
    assert_eq!(updated.name_en, None);
    assert_eq!(updated.name_zh.as_deref(), Some("甲醫生"));

    assert_matches!(
        service.update_doctor(404, UpdateDoctorRequest::default()).await,
        Err(DoctorError::NotFound(404))
    );
}

#[tokio::test]
async fn test_suspending_keeps_affiliation_date() {
    let pool = pool().await;
    let id = DoctorService::from_pool(pool.clone())
        .create_doctor(doctor("Dr. Ma", "Oncology", "Kowloon City", 0))
        .await
        .unwrap()
        .id;

    let affiliation = AffiliationService::from_pool(pool);
    let affiliated = affiliation
        .set_status(id, AffiliationStatus::Affiliated, Some("91234567".to_string()))
        .await
        .unwrap();
    assert!(affiliated.is_affiliated());

    let suspended = affiliation.set_status(id, AffiliationStatus::Suspended, None).await.unwrap();
    assert_eq!(suspended.affiliated_at, affiliated.affiliated_at);
    assert_eq!(suspended.whatsapp_number.as_deref(), Some("91234567"));

    let removed = affiliation.set_status(id, AffiliationStatus::Unaffiliated, None).await.unwrap();
    assert!(removed.affiliated_at.is_none());

    assert_matches!(
        affiliation.set_status(id, AffiliationStatus::Suspended, None).await,
        Err(DoctorError::InvalidAffiliationTransition { .. })
    );
}

#[tokio::test]
async fn test_append_import_keeps_existing_rows() {
    let pool = pool().await;
    let service = DoctorService::from_pool(pool.clone());
    service.create_doctor(doctor("Existing", "Urology", "Tsuen Wan", 0)).await.unwrap();

    let csv = "name_en,specialty_en,priority_flag\nDr. New,ENT,abc\nDr. Newer,ENT,1\n";
    let report = DoctorCsvService::from_pool(pool)
        .import(csv, ImportMode::Append)
        .await
        .unwrap();

    assert_eq!(report.imported, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].line, 2);
    assert_eq!(service.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_exported_csv_reimports() {
    let pool = pool().await;
    let service = DoctorService::from_pool(pool.clone());
    let first = service.create_doctor(doctor("Dr. A", "Cardiology", "Sai Kung", 1)).await.unwrap().id;
    service.create_doctor(doctor("Dr. B", "Dermatology", "Yuen Long", 0)).await.unwrap();
    service.delete_doctor(first).await.unwrap();
    let id = service.create_doctor(doctor("Dr. C", "Oncology", "Sha Tin", 0)).await.unwrap().id;

    let affiliated = AffiliationService::from_pool(pool.clone())
        .set_status(id, AffiliationStatus::Affiliated, Some("91234567".to_string()))
        .await
        .unwrap();

    let csv_service = DoctorCsvService::from_pool(pool);
    let exported = csv_service.export().await.unwrap();
    let report = csv_service.import(&exported, ImportMode::Replace).await.unwrap();

    assert_eq!(report.imported, 2);
    assert!(report.skipped.is_empty());

    let ids: Vec<_> = service.list_all().await.unwrap().iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![2, id]);

    let restored = service.get_doctor(id).await.unwrap();
    assert_eq!(restored.affiliation_status, AffiliationStatus::Affiliated);
    assert_eq!(restored.whatsapp_number.as_deref(), Some("91234567"));
    assert_eq!(restored.affiliated_at, affiliated.affiliated_at);
    assert_eq!(service.get_doctor(2).await.unwrap().affiliation_status, AffiliationStatus::Unaffiliated);
}

#[tokio::test]
async fn test_append_import_assigns_new_ids() {
    let pool = pool().await;
    let service = DoctorService::from_pool(pool.clone());
    service.create_doctor(doctor("Existing", "Urology", "Tsuen Wan", 0)).await.unwrap();

    let csv = "id,name_en,specialty_en,affiliation_status\n1,Dr. Copy,Urology,pending\n";
    let report = DoctorCsvService::from_pool(pool).import(csv, ImportMode::Append).await.unwrap();

    assert_eq!(report.imported, 1);
    let copy = service.get_doctor(2).await.unwrap();
    assert_eq!(copy.name_en.as_deref(), Some("Dr. Copy"));
    assert_eq!(copy.affiliation_status, AffiliationStatus::Pending);
}

#[tokio::test]
async fn test_import_reports_lines_after_multiline_cells() {
    let pool = pool().await;
    let csv = "name_en,specialty_en,address_en\n\
               Dr. Lo,ENT,\"Flat A\n12/F\nNathan Road\"\n\
               ,ENT,Jordan\n";

    let report = DoctorCsvService::from_pool(pool).import(csv, ImportMode::Append).await.unwrap();

    assert_eq!(report.imported, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].line, 5);
}

#[tokio::test]
async fn test_find_incomplete_records() {
    let pool = pool().await;
    let service = DoctorService::from_pool(pool);
    service
        .create_doctor(CreateDoctorRequest {
            name_en: Some("Dr. Full".to_string()),
            name_zh: Some("全醫生".to_string()),
            specialty_en: Some("Cardiology".to_string()),
            address_zh: Some("旺角".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    service.create_doctor(doctor("Dr. Half", "Cardiology", "Mong Kok", 0)).await.unwrap();

    let incomplete = service.find_incomplete().await.unwrap();
    assert_eq!(incomplete.len(), 1);
    assert_eq!(incomplete[0].name_en.as_deref(), Some("Dr. Half"));
}
