use asset_relocator::path_utils::create_safe_source_uuid;
use asset_relocator::storage::models::DependencyType;
use asset_relocator::{AssetDatabase, SqliteAssetDatabase};
use tempfile::tempdir;

struct Fixture {
    db: SqliteAssetDatabase,
    folder: i64,
}

fn fixture() -> Fixture {
    let db = SqliteAssetDatabase::open_in_memory().unwrap();
    let folder = db.upsert_scan_folder("/root", "root", "root", false).unwrap();
    Fixture { db, folder }
}

#[test]
fn test_products_are_found_through_jobs() {
    let f = fixture();
    let guid = create_safe_source_uuid("textures/wood.png");
    let source = f.db.insert_source(f.folder, "textures/wood.png", &guid).unwrap();
    let pc_job = f.db.insert_job(source, "pc", "image").unwrap();
    let mobile_job = f.db.insert_job(source, "mobile", "image").unwrap();
    let pc_product = f.db.insert_product(pc_job, 0, "pc/textures/wood.dds").unwrap();
    f.db.insert_product(mobile_job, 0, "mobile/textures/wood.dds").unwrap();

    let products: Vec<_> = f.db.query_products_by_source_id(source).unwrap().collect();
    assert_eq!(products.len(), 2);

    let pc_only: Vec<_> = f
        .db
        .query_product_by_source_guid_sub_id(&guid, 0, "pc")
        .unwrap()
        .collect();
    assert_eq!(pc_only.len(), 1);
    assert_eq!(pc_only[0].product_id, pc_product);

    let any_platform = f.db.query_product_by_source_guid_sub_id(&guid, 0, "").unwrap();
    assert_eq!(any_platform.count(), 2);

    let owner = f.db.first_source_by_product_id(pc_product).unwrap().unwrap();
    assert_eq!(owner.source_id, source);
}

#[test]
fn test_source_dependencies_match_guid_name_or_path() {
    let f = fixture();
    let target_guid = create_safe_source_uuid("target.txt");
    f.db.insert_source(f.folder, "target.txt", &target_guid).unwrap();

    let by_guid = create_safe_source_uuid("a.txt");
    let by_name = create_safe_source_uuid("b.txt");
    let by_path = create_safe_source_uuid("c.txt");
    let unrelated = create_safe_source_uuid("d.txt");
    f.db.insert_source_dependency(&by_guid, &target_guid.to_string(), DependencyType::SourceToSource, true)
        .unwrap();
    f.db.insert_source_dependency(&by_name, "TARGET.txt", DependencyType::JobToJob, false)
        .unwrap();
    f.db.insert_source_dependency(&by_path, "/root/target.txt", DependencyType::SourceToSource, false)
        .unwrap();
    f.db.insert_source_dependency(&unrelated, "other.txt", DependencyType::SourceToSource, false)
        .unwrap();

    let rows: Vec<_> = f
        .db
        .query_source_dependency_by_depends_on_source(&target_guid, "target.txt", "/root/target.txt")
        .unwrap()
        .collect();

    let dependents: Vec<_> = rows.iter().map(|row| row.source_guid).collect();
    assert_eq!(dependents, vec![by_guid, by_name, by_path]);
    assert!(rows[0].from_asset_id);
    assert_eq!(rows[1].type_of_dependency, DependencyType::JobToJob);
}

#[test]
fn test_product_dependencies_on_source() {
    let f = fixture();
    let target_guid = create_safe_source_uuid("mesh.fbx");
    let target = f.db.insert_source(f.folder, "mesh.fbx", &target_guid).unwrap();

    let user_guid = create_safe_source_uuid("level.lvl");
    let user = f.db.insert_source(f.folder, "level.lvl", &user_guid).unwrap();
    let job = f.db.insert_job(user, "pc", "level").unwrap();
    let product = f.db.insert_product(job, 0, "pc/level.lvlc").unwrap();

    f.db.insert_product_dependency(product, &target_guid, 1, "pc", 0, false)
        .unwrap();
    f.db.insert_product_dependency(product, &user_guid, 0, "pc", 0, true)
        .unwrap();

    let rows: Vec<_> = f
        .db
        .query_product_dependencies_that_depend_on_source(target)
        .unwrap()
        .collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].product_pk, product);
    assert_eq!(rows[0].dependency_sub_id, 1);
    assert_eq!(rows[0].dependency_source_guid, target_guid);
}

#[test]
fn test_stopping_early_drops_remaining_rows() {
    let f = fixture();
    for name in ["a.txt", "b.txt", "c.txt"] {
        f.db
            .insert_source_dependency(&create_safe_source_uuid(name), "target.txt", DependencyType::SourceToSource, false)
            .unwrap();
    }

    let mut rows = f
        .db
        .query_source_dependency_by_depends_on_source(&uuid::Uuid::nil(), "target.txt", "")
        .unwrap();
    assert!(rows.next().is_some());
    drop(rows);

    // A fresh query starts over.
    let again = f
        .db
        .query_source_dependency_by_depends_on_source(&uuid::Uuid::nil(), "target.txt", "")
        .unwrap();
    assert_eq!(again.count(), 3);
}

#[test]
fn test_database_persists_on_disk() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("assets.db");
    let path = path.to_string_lossy();

    {
        let db = SqliteAssetDatabase::open(&path).unwrap();
        let folder = db.upsert_scan_folder("/root", "root", "root", false).unwrap();
        db.insert_source(folder, "kept.txt", &create_safe_source_uuid("kept.txt"))
            .unwrap();
    }

    let db = SqliteAssetDatabase::open(&path).unwrap();
    assert_eq!(db.source_count().unwrap(), 1);

    db.truncate_all().unwrap();
    assert_eq!(db.source_count().unwrap(), 0);
}
