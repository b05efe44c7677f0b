//! Full runs against an in-memory DuckDB database.

use cxdeploy::{
    DdlUnit, DeployConfig, DeploymentStatus, MessageKind, SchemaDeployment, XmlDeploymentLoader,
};
use cxdeploy_db::DbConnection;
use cxdeploy_test_utils::{
    capture_logs, write_archive, write_corrupt_type, write_deployment, write_type, Level,
    TypeFixture,
};
use std::path::Path;
use tempfile::TempDir;

fn config(output: &Path, packages: &[&str]) -> DeployConfig {
    DeployConfig {
        packages: Some(packages.iter().map(|p| p.to_string()).collect()),
        ..DeployConfig::for_output(output)
    }
}

fn run(config: DeployConfig, conn: &DbConnection) -> cxdeploy::RunSummary {
    SchemaDeployment::new(
        config,
        DdlUnit::new(conn.clone()),
        XmlDeploymentLoader::new(conn.clone()),
    )
    .execute()
    .expect("run should succeed")
}

fn count(conn: &DbConnection, table: &str) -> i64 {
    conn.query_scalar(&format!("SELECT COUNT(*) FROM {}", table), &[])
        .expect("count query")
}

#[test]
fn exports_tables_and_loads_seed_data() {
    let out = TempDir::new().unwrap();
    let root = out.path();
    write_type(root, "com.acme.model.Users", &TypeFixture::table("users")).unwrap();
    write_type(
        root,
        "com.acme.model.Orders",
        &TypeFixture::table_in("sales", "orders"),
    )
    .unwrap();
    write_type(
        root,
        "com.acme.model.Audit",
        &TypeFixture::table("audit").singleton("com.acme.model.Audit"),
    )
    .unwrap();
    write_type(root, "com.acme.model.Helper", &TypeFixture::plain()).unwrap();
    write_type(
        root,
        "com.acme.model.Base",
        &TypeFixture::table("base").abstract_type(),
    )
    .unwrap();
    write_type(root, "com.acme.model.Users$Row", &TypeFixture::table("rows")).unwrap();

    write_deployment(
        root,
        "default.cxd.xml",
        r#"<deployment><users id="1" label="admin"/></deployment>"#,
    )
    .unwrap();
    write_deployment(
        root,
        "com/acme/model/orders.cxd.xml",
        r#"<deployment schema="sales">
             <orders id="10" label="first"/>
             <orders id="11"><label>second</label></orders>
           </deployment>"#,
    )
    .unwrap();

    let conn = DbConnection::open_duckdb_memory().unwrap();
    let summary = run(config(root, &["com.acme.model"]), &conn);

    let mut names: Vec<String> = summary.objects.iter().map(|o| o.name.clone()).collect();
    names.sort();
    assert_eq!(names, vec!["audit", "orders", "users"]);
    assert_eq!(summary.schemata, 2);
    assert!(summary.created);
    assert_eq!(summary.error_count(), 0);

    let ids: Vec<&str> = summary
        .deployments
        .iter()
        .map(|d| d.deployment.as_str())
        .collect();
    assert_eq!(ids, vec!["default.cxd.xml", "com/acme/model/orders.cxd.xml"]);
    assert!(summary.deployments.iter().all(|d| d.is_applied()));

    assert_eq!(count(&conn, "main.users"), 1);
    assert_eq!(count(&conn, "sales.orders"), 2);
    assert_eq!(count(&conn, "main.audit"), 0);
}

#[test]
fn drop_then_create_is_repeatable() {
    let out = TempDir::new().unwrap();
    write_type(out.path(), "app.Users", &TypeFixture::table("users")).unwrap();
    write_deployment(
        out.path(),
        "default.cxd.xml",
        r#"<deployment><users id="1" label="admin"/></deployment>"#,
    )
    .unwrap();
    let conn = DbConnection::open_duckdb_memory().unwrap();

    let first = run(config(out.path(), &["app"]), &conn);
    assert_eq!(first.error_count(), 0);

    let second = run(
        DeployConfig {
            drop: true,
            ..config(out.path(), &["app"])
        },
        &conn,
    );
    assert!(second.dropped);
    assert_eq!(second.error_count(), 0);
    assert_eq!(count(&conn, "main.users"), 1);
}

#[test]
fn second_create_without_drop_reports_errors_but_still_deploys() {
    let out = TempDir::new().unwrap();
    write_type(out.path(), "app.Users", &TypeFixture::table("users")).unwrap();
    write_deployment(
        out.path(),
        "default.cxd.xml",
        r#"<deployment on-exist="skip"><users id="1" label="admin"/></deployment>"#,
    )
    .unwrap();
    let conn = DbConnection::open_duckdb_memory().unwrap();

    run(config(out.path(), &["app"]), &conn);
    let (second, logs) = capture_logs(|| run(config(out.path(), &["app"]), &conn));

    assert_eq!(second.error_count(), 1);
    assert!(second
        .messages
        .iter()
        .any(|m| m.kind() == MessageKind::Error && m.sql().is_some()));
    assert_eq!(logs.count(Level::ERROR), 1);
    assert!(second.deployments[0].is_applied());
    assert_eq!(count(&conn, "main.users"), 1);
}

#[test]
fn one_broken_type_and_one_bad_deployment_are_isolated() {
    let out = TempDir::new().unwrap();
    let root = out.path();
    write_type(root, "app.Accounts", &TypeFixture::table("accounts")).unwrap();
    write_corrupt_type(root, "app.Broken").unwrap();
    write_type(root, "app.Users", &TypeFixture::table("users")).unwrap();
    write_deployment(root, "default.cxd.xml", "<deployment><accounts").unwrap();
    write_deployment(
        root,
        "app/users.cxd.xml",
        r#"<deployment><users id="7" label="x"/></deployment>"#,
    )
    .unwrap();

    let conn = DbConnection::open_duckdb_memory().unwrap();
    let (summary, logs) = capture_logs(|| {
        run(
            DeployConfig {
                deployments: vec!["extra.cxd.xml".to_string()],
                ..config(root, &["app", "app.missing"])
            },
            &conn,
        )
    });

    assert_eq!(summary.objects.len(), 2);
    let statuses: Vec<&DeploymentStatus> = summary.deployments.iter().map(|d| &d.status).collect();
    assert!(matches!(statuses[0], DeploymentStatus::Failed { .. }));
    assert_eq!(statuses[1], &DeploymentStatus::Applied { rows: 1 });
    assert_eq!(statuses[2], &DeploymentStatus::Missing);

    assert!(logs.contains(Level::ERROR, "Broken.type.json"));
    assert!(logs.contains(Level::WARN, "Omitting non-existent package app/missing"));
    assert!(logs.contains(Level::ERROR, "Could not process deployment default.cxd.xml."));
    assert!(logs.contains(Level::WARN, "Omitting non-existent deployment extra.cxd.xml."));
    assert_eq!(count(&conn, "main.users"), 1);
}

#[test]
fn types_are_found_in_archive_classpath_roots() {
    let out = TempDir::new().unwrap();
    let deps = TempDir::new().unwrap();
    std::fs::create_dir_all(out.path().join("lib")).unwrap();
    let jar = write_archive(
        &deps.path().join("model.zip"),
        &[("lib.Shared", &TypeFixture::table("shared"))],
    )
    .unwrap();
    write_type(
        out.path(),
        "lib.Local",
        &TypeFixture::table("local").singleton("lib.Shared"),
    )
    .unwrap();

    let conn = DbConnection::open_duckdb_memory().unwrap();
    let summary = run(
        DeployConfig {
            classpath: vec![jar],
            ..config(out.path(), &["lib"])
        },
        &conn,
    );

    let names: Vec<&str> = summary.objects.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["local"]);
    assert_eq!(count(&conn, "main.local"), 0);
}

#[test]
fn registration_outcome_does_not_depend_on_package_order() {
    let out = TempDir::new().unwrap();
    write_type(out.path(), "a.Users", &TypeFixture::table("users")).unwrap();
    write_type(out.path(), "b.Orders", &TypeFixture::table("orders")).unwrap();
    write_type(out.path(), "b.Helper", &TypeFixture::plain()).unwrap();

    let mut seen = Vec::new();
    for packages in [&["a", "b"][..], &["b", "a"][..]] {
        let conn = DbConnection::open_duckdb_memory().unwrap();
        let summary = run(config(out.path(), packages), &conn);
        let mut names: Vec<String> = summary.objects.into_iter().map(|o| o.name).collect();
        names.sort();
        seen.push(names);
    }
    assert_eq!(seen[0], seen[1]);
    assert_eq!(seen[0], vec!["orders", "users"]);
}

#[test]
fn failing_create_statement_does_not_stop_other_objects() {
    let out = TempDir::new().unwrap();
    let root = out.path();
    write_type(root, "app.Accounts", &TypeFixture::table("accounts")).unwrap();
    write_type(
        root,
        "app.Broken",
        &TypeFixture::table("broken")
            .create(&["BROKEN SQL"])
            .drop_statements(&["DROP VIEW IF EXISTS main.broken"]),
    )
    .unwrap();
    write_type(root, "app.Legacy", &TypeFixture::table("legacy").without_capability()).unwrap();

    let conn = DbConnection::open_duckdb_memory().unwrap();
    let (summary, logs) = capture_logs(|| {
        run(
            DeployConfig {
                drop: true,
                ..config(root, &["app"])
            },
            &conn,
        )
    });

    let mut names: Vec<&str> = summary.objects.iter().map(|o| o.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["accounts", "broken"]);

    assert_eq!(summary.error_count(), 1);
    let failed = summary
        .messages
        .iter()
        .find(|m| m.kind() == MessageKind::Error)
        .unwrap();
    assert_eq!(failed.sql(), Some("BROKEN SQL"));
    assert!(summary.messages.iter().any(|m| {
        m.kind() == MessageKind::Info && m.sql() == Some("DROP VIEW IF EXISTS main.broken")
    }));
    assert_eq!(logs.count(Level::ERROR), 1);

    assert_eq!(count(&conn, "main.accounts"), 0);
    let legacy: i64 = conn
        .query_scalar(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'legacy'",
            &[],
        )
        .unwrap();
    assert_eq!(legacy, 0);
}
