//! Tests for db::factory module - repository selection and configuration.

mod support;

use std::io::Write;
use std::str::FromStr;

use valyanmed::db::factory::{RepositoryBuilder, RepositoryFactory, RepositoryType};
use valyanmed::db::repository::{HealthRepository, UserRepository};
use valyanmed::db::{
    create_repository_from_paths, RepositoryConfig, RepositoryError, SqlServerConfig,
};

#[test]
fn test_repository_type_from_str_sqlserver() {
    for name in ["sqlserver", "SQLSERVER", "sql_server", "mssql", " MsSql "] {
        assert_eq!(RepositoryType::from_str(name).unwrap(), RepositoryType::SqlServer);
    }
}

#[test]
fn test_repository_type_from_str_local() {
    assert_eq!(RepositoryType::from_str("local").unwrap(), RepositoryType::Local);
    assert_eq!(RepositoryType::from_str("Memory").unwrap(), RepositoryType::Local);
}

#[test]
fn test_repository_type_from_str_invalid() {
    let result = RepositoryType::from_str("postgres");
    assert!(result.unwrap_err().contains("Unknown repository type"));
}

#[test]
fn test_repository_type_from_env_default() {
    support::with_scoped_env(&[("REPOSITORY_TYPE", None), ("DB_SERVER", None)], || {
        assert_eq!(RepositoryType::from_env(), RepositoryType::Local);
    });
}

#[test]
fn test_repository_type_from_env_with_db_server() {
    support::with_scoped_env(
        &[("REPOSITORY_TYPE", None), ("DB_SERVER", Some("db.clinic.local"))],
        || {
            assert_eq!(RepositoryType::from_env(), RepositoryType::SqlServer);
        },
    );
}

#[test]
fn test_repository_type_from_env_explicit_wins() {
    support::with_scoped_env(
        &[("REPOSITORY_TYPE", Some("local")), ("DB_SERVER", Some("db.clinic.local"))],
        || {
            assert_eq!(RepositoryType::from_env(), RepositoryType::Local);
        },
    );
}

#[test]
fn test_repository_type_from_env_invalid_defaults_to_local() {
    support::with_scoped_env(&[("REPOSITORY_TYPE", Some("oracle"))], || {
        assert_eq!(RepositoryType::from_env(), RepositoryType::Local);
    });
}

#[tokio::test]
async fn test_create_local_via_factory() {
    let repo = RepositoryFactory::create(RepositoryType::Local, None)
        .await
        .unwrap();
    assert!(repo.health_check().await.unwrap());
    assert_eq!(repo.count_users().await.unwrap(), 0);
}

#[cfg(not(feature = "sqlserver-repo"))]
#[tokio::test]
async fn test_create_sqlserver_without_feature_fails() {
    let config = SqlServerConfig::default();
    let err = RepositoryFactory::create(RepositoryType::SqlServer, Some(&config))
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("feature not enabled"));
}

#[cfg(feature = "sqlserver-repo")]
#[tokio::test]
async fn test_create_sqlserver_without_config_fails() {
    let err = RepositoryFactory::create(RepositoryType::SqlServer, None)
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("requires SqlServerConfig"));
}

#[test]
fn test_sqlserver_config_from_env_requires_credentials() {
    support::with_scoped_env(
        &[
            ("DB_SERVER", Some("db.clinic.local")),
            ("DB_DATABASE", Some("ValyanMed")),
            ("DB_USERNAME", None),
            ("DB_PASSWORD", None),
        ],
        || {
            let err = SqlServerConfig::from_env().unwrap_err();
            assert!(err.contains("DB_USERNAME"));
        },
    );
}

#[test]
fn test_sqlserver_config_from_env() {
    support::with_scoped_env(
        &[
            ("DB_SERVER", Some("db.clinic.local")),
            ("DB_DATABASE", Some("ValyanMed")),
            ("DB_USERNAME", Some("valyan_app")),
            ("DB_PASSWORD", Some("s3cret")),
            ("DB_PORT", Some("14330")),
            ("DB_POOL_MAX", None),
            ("DB_CONN_TIMEOUT_SEC", None),
            ("DB_TRUST_CERT", None),
        ],
        || {
            let config = SqlServerConfig::from_env().unwrap();
            assert_eq!(config.port, 14330);
            assert_eq!(config.max_pool_size, 10);
            assert!(config.trust_cert);
        },
    );
}

#[test]
fn test_config_password_from_env_variable() {
    let toml = r#"
[repository]
type = "sqlserver"

[sqlserver]
database = "ValyanMed"
username = "valyan_app"
password_env = "VALYANMED_TEST_DB_PASSWORD"
"#;
    let config = RepositoryConfig::from_toml_str(toml).unwrap();

    support::with_scoped_env(&[("VALYANMED_TEST_DB_PASSWORD", None)], || {
        assert!(matches!(
            config.to_sqlserver_config(),
            Err(RepositoryError::ConfigurationError { .. })
        ));
    });

    support::with_scoped_env(&[("VALYANMED_TEST_DB_PASSWORD", Some("from-env"))], || {
        let sql = config.to_sqlserver_config().unwrap().unwrap();
        assert_eq!(sql.password, "from-env");
        assert_eq!(sql.server, "localhost");
        assert_eq!(sql.port, 1433);
    });
}

#[tokio::test]
async fn test_factory_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[repository]\ntype = \"local\"").unwrap();

    let repo = RepositoryFactory::from_config_file(file.path()).await.unwrap();
    assert!(repo.health_check().await.unwrap());
}

#[tokio::test]
async fn test_factory_from_missing_file_is_configuration_error() {
    let result = RepositoryFactory::from_config_file("/nonexistent/repository.toml").await;
    assert!(matches!(
        result,
        Err(RepositoryError::ConfigurationError { .. })
    ));
}

#[tokio::test]
async fn test_builder_apply_config() {
    let config = RepositoryConfig::from_toml_str("[repository]\ntype = \"memory\"\n").unwrap();
    let repo = RepositoryBuilder::new()
        .repository_type(RepositoryType::SqlServer)
        .apply_config(&config)
        .unwrap()
        .build()
        .await
        .unwrap();
    assert!(repo.health_check().await.unwrap());
}

#[test]
fn test_find_in_skips_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("repository.toml");
    let present = dir.path().join("backend.toml");
    std::fs::write(&present, "[repository]\ntype = \"local\"\n").unwrap();

    assert!(RepositoryConfig::find_in(&[&missing]).unwrap().is_none());
    let config = RepositoryConfig::find_in(&[&missing, &present]).unwrap().unwrap();
    assert_eq!(config.repository.repo_type, "local");
}

#[tokio::test]
async fn test_malformed_config_file_is_not_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("repository.toml");
    std::fs::write(&path, "[repository\ntype = local").unwrap();

    assert!(matches!(
        RepositoryConfig::find_in(&[&path]),
        Err(RepositoryError::ConfigurationError { .. })
    ));

    let result = create_repository_from_paths(&[&path]).await;
    assert!(matches!(
        result,
        Err(RepositoryError::ConfigurationError { .. })
    ));
}

#[tokio::test]
async fn test_config_file_decides_the_backend() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("repository.toml");
    std::fs::write(&path, "[repository]\ntype = \"local\"\n").unwrap();

    let repo = create_repository_from_paths(&[&path]).await.unwrap();
    assert!(repo.health_check().await.unwrap());
}
