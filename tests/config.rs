// ABOUTME: Integration tests for configuration parsing and validation.
// ABOUTME: Tests YAML parsing, environment merging, resolution, and persistence.

use releasectl::config::*;
use releasectl::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

const FULL: &str = r#"
Namespace: shop
GitHub:
  Repo: acme/shop
Shared: [var/logs, web/uploads]
Remove: [web/app_dev.php]
Chown:
  Pre:  { Group: www-data, Paths: [var] }
  Post: { Group: www-data, Paths: [] }
Chmod:
  Pre:  { Permission: "2775", Paths: [var] }
  Post: { Permission: null, Paths: [] }
Root: /srv/shop
Environments:
  staging:
    Root: /srv/shop-staging
    Releases: /srv/shop-staging/builds
    ProcessTimeout: 10m
    UseSudo: true
    PermissionsProcess: www-data
    KeepReleases: 3
"#;

mod parsing {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let config = Config::from_yaml("Root: /srv/app\n").unwrap();
        assert_eq!(config.defaults.root, Some(PathBuf::from("/srv/app")));
        assert!(config.shared.is_empty());
        assert!(config.environments.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let config = Config::from_yaml(FULL).unwrap();

        assert_eq!(config.namespace.as_deref(), Some("shop"));
        assert_eq!(config.github.repo.as_deref(), Some("acme/shop"));
        assert_eq!(
            config.shared,
            vec![PathBuf::from("var/logs"), PathBuf::from("web/uploads")]
        );
        assert_eq!(config.remove, vec![PathBuf::from("web/app_dev.php")]);
        assert_eq!(
            config.chown.pre.group.as_ref().map(|g| g.as_str()),
            Some("www-data")
        );
        assert!(!config.chown.post.is_active());
        assert_eq!(
            config.chmod.pre.permission.as_ref().map(|p| p.as_str()),
            Some("2775")
        );
        assert!(config.chmod.post.permission.is_none());

        let staging = &config.environments["staging"];
        assert_eq!(staging.process_timeout, Some(Duration::from_secs(600)));
        assert_eq!(staging.keep_releases, Some(3));
    }

    #[test]
    fn rejects_invalid_group() {
        let yaml = "Root: /srv/app\nChown:\n  Pre: { Group: \"www;rm -rf\", Paths: [var] }\n";
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn rejects_invalid_permission() {
        let yaml = "Root: /srv/app\nChmod:\n  Pre: { Permission: \"999\", Paths: [var] }\n";
        assert!(Config::from_yaml(yaml).is_err());
    }
}

mod resolution {
    use super::*;

    #[test]
    fn top_level_values_apply_without_environment() {
        let resolved = Config::from_yaml(FULL).unwrap().resolve(None).unwrap();

        assert_eq!(resolved.root, PathBuf::from("/srv/shop"));
        assert_eq!(resolved.releases, PathBuf::from("/srv/shop/releases"));
        assert_eq!(resolved.keep_releases, DEFAULT_KEEP_RELEASES);
        assert_eq!(resolved.process_timeout, DEFAULT_PROCESS_TIMEOUT);
        assert!(!resolved.use_sudo);
        assert_eq!(resolved.permissions_process, None);
        assert_eq!(
            resolved.rollback_fixup_paths,
            vec![
                PathBuf::from("var/cache"),
                PathBuf::from("var/logs"),
                PathBuf::from("var/sessions")
            ]
        );
        assert_eq!(resolved.current_link(), PathBuf::from("/srv/shop/current"));
        assert_eq!(resolved.shared_root(), PathBuf::from("/srv/shop/shared"));
        assert_eq!(
            resolved.lock_path(),
            PathBuf::from("/srv/shop/.releasectl.lock")
        );
    }

    #[test]
    fn named_environment_overrides_defaults() {
        let resolved = Config::from_yaml(FULL)
            .unwrap()
            .resolve(Some("staging"))
            .unwrap();

        assert_eq!(resolved.root, PathBuf::from("/srv/shop-staging"));
        assert_eq!(resolved.releases, PathBuf::from("/srv/shop-staging/builds"));
        assert_eq!(resolved.process_timeout, Duration::from_secs(600));
        assert!(resolved.use_sudo);
        assert_eq!(
            resolved.permissions_process.as_ref().map(|g| g.as_str()),
            Some("www-data")
        );
        assert_eq!(resolved.keep_releases, 3);
        assert_eq!(resolved.shared.len(), 2);
    }

    #[test]
    fn unknown_environment_is_an_error() {
        let err = Config::from_yaml(FULL)
            .unwrap()
            .resolve(Some("production"))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownEnvironment(name) if name == "production"));
    }

    #[test]
    fn missing_root_is_invalid() {
        let err = Config::from_yaml("Namespace: app\n")
            .unwrap()
            .resolve(None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn relative_root_is_invalid() {
        let err = Config::from_yaml("Root: srv/app\n")
            .unwrap()
            .resolve(None)
            .unwrap_err();
        assert!(err.to_string().contains("Root"), "{err}");
    }

    #[test]
    fn keep_releases_below_two_is_invalid() {
        let err = Config::from_yaml("Root: /srv/app\nKeepReleases: 1\n")
            .unwrap()
            .resolve(None)
            .unwrap_err();
        assert!(err.to_string().contains("KeepReleases"), "{err}");
    }

    #[test]
    fn escaping_shared_path_is_invalid() {
        let err = Config::from_yaml("Root: /srv/app\nShared: [../etc]\n")
            .unwrap()
            .resolve(None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn custom_fixup_paths_replace_defaults() {
        let resolved = Config::from_yaml("Root: /srv/app\nRollbackFixupPaths: [storage]\n")
            .unwrap()
            .resolve(None)
            .unwrap();
        assert_eq!(resolved.rollback_fixup_paths, vec![PathBuf::from("storage")]);
    }
}

mod persistence {
    use super::*;

    fn write(dir: &Path, yaml: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILENAME);
        std::fs::write(&path, yaml).unwrap();
        path
    }

    #[test]
    fn save_writes_empty_lists_explicitly() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "Root: /srv/app\nShared: [var/logs]\n");

        let mut config = Config::load(&path).unwrap();
        assert!(config.remove_shared(Path::new("var/logs")));
        config.save(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Shared: []"), "{content}");
        assert!(content.contains("Remove: []"), "{content}");
    }

    #[test]
    fn mutations_survive_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "Root: /srv/app\n");

        let mut config = Config::load(&path).unwrap();
        assert!(config.add_shared("var/logs"));
        assert!(!config.add_shared("var/logs"));
        config.add_remove("web/app_dev.php");
        config.set_chown_group(
            PermissionPhase::Post,
            Some(releasectl::types::GroupName::new("www-data").unwrap()),
        );
        config.add_chown_path(PermissionPhase::Post, "var");
        config.set_chmod_permission(
            PermissionPhase::Pre,
            Some(releasectl::types::Permission::new("g+w").unwrap()),
        );
        config.add_chmod_path(PermissionPhase::Pre, "var");
        config.set_repo(Some("acme/shop".to_string()));
        config.save(&path).unwrap();

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded, config);
        assert!(reloaded.chown.post.is_active());
        assert!(reloaded.chmod.pre.is_active());
    }

    #[test]
    fn find_prefers_primary_file_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME_ALT), "Root: /a\n").unwrap();
        assert_eq!(
            Config::find(dir.path()).unwrap(),
            dir.path().join(CONFIG_FILENAME_ALT)
        );

        write(dir.path(), "Root: /b\n");
        assert_eq!(
            Config::find(dir.path()).unwrap(),
            dir.path().join(CONFIG_FILENAME)
        );
    }

    #[test]
    fn find_reports_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::find(dir.path()),
            Err(Error::ConfigNotFound(_))
        ));
    }

    #[test]
    fn init_writes_loadable_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = init_config(dir.path(), Some("shop"), Some(Path::new("/srv/shop")), false)
            .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.namespace.as_deref(), Some("shop"));
        assert_eq!(
            config.resolve(None).unwrap().root,
            PathBuf::from("/srv/shop")
        );

        let again = init_config(dir.path(), None, None, false).unwrap_err();
        assert!(matches!(again, Error::AlreadyExists(_)));
        assert!(init_config(dir.path(), None, None, true).is_ok());
    }
}
