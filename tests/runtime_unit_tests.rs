//! Unit tests for runtime variable resolution

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use devrig::cache::{ImageCache, LocalCache, RemoteCache};
    use devrig::config::{ConfigAggregate, ImageConfig, ImageNameTag, RigConfig};
    use devrig::dependency::Dependency;
    use devrig::runtime::{
        RuntimeResolver, check_runtime_variable_placement, load_runtime_variable,
    };
    use devrig::system::mock::MockSystem;
    use serde_yaml::Value;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    fn aggregate(resolved: HashMap<String, Value>) -> ConfigAggregate {
        let mut parsed = RigConfig::default();
        parsed.images.insert(
            "app".to_owned(),
            ImageConfig {
                image: "ghcr.io/acme/app".to_owned(),
                tags: vec!["dev-###".to_owned()],
                ..ImageConfig::default()
            },
        );

        let system = MockSystem::new();
        ConfigAggregate::new(
            Value::Null,
            parsed,
            resolved,
            Arc::new(LocalCache::empty(Path::new("/p/.devrig/cache.yaml"))),
            Arc::new(RemoteCache::load(&system, Path::new("/p/.devrig/remote.yaml"))),
            Path::new("/p/devrig.yaml"),
        )
    }

    #[test]
    fn image_variable_combines_name_and_tag() {
        let config = aggregate(HashMap::new());
        let (_, value) = load_runtime_variable("runtime.images.app", &config, &[]).unwrap();
        assert_eq!(value, Value::String("ghcr.io/acme/app:dev-xxx".to_owned()));

        let (_, value) = load_runtime_variable("runtime.images.app.image", &config, &[]).unwrap();
        assert_eq!(value, Value::String("ghcr.io/acme/app".to_owned()));

        let (_, value) = load_runtime_variable("runtime.images.app.tag", &config, &[]).unwrap();
        assert_eq!(value, Value::String("dev-xxx".to_owned()));
    }

    #[test]
    fn cached_tag_wins_over_static_tags() {
        let config = aggregate(HashMap::new());
        config.local_cache().set_image_cache(
            "app",
            ImageCache {
                image_name: "ghcr.io/acme/app".to_owned(),
                tag: "built-9".to_owned(),
                ..ImageCache::default()
            },
        );

        let (_, value) = load_runtime_variable("runtime.images.app.tag", &config, &[]).unwrap();
        assert_eq!(value, Value::String("built-9".to_owned()));
    }

    #[test]
    fn built_images_set_the_rebuild_flag() {
        let config = aggregate(HashMap::new());
        config.set_built_image(
            "app",
            ImageNameTag {
                image_name: "ghcr.io/acme/app".to_owned(),
                tag: "dev-xxx".to_owned(),
            },
        );

        let (rebuild, _) = load_runtime_variable("runtime.images.app", &config, &[]).unwrap();
        assert!(rebuild);
    }

    #[test]
    fn ad_hoc_runtime_values_win_over_image_lookups() {
        let config = aggregate(HashMap::new());
        config.set_runtime_variable("images.app", Value::String("pinned".to_owned()));

        let (_, value) = load_runtime_variable("runtime.images.app", &config, &[]).unwrap();
        assert_eq!(value, Value::String("pinned".to_owned()));
    }

    #[test]
    fn unknown_runtime_variables_are_fatal() {
        let config = aggregate(HashMap::new());
        let err = load_runtime_variable("runtime.nope", &config, &[])
            .unwrap_err()
            .to_string();
        assert!(err.contains("couldn't find runtime variable runtime.nope"));

        let err = load_runtime_variable("runtime.images.missing", &config, &[])
            .unwrap_err()
            .to_string();
        assert!(err.contains("couldn't find image missing"));
    }

    #[test]
    fn dependency_variables_redirect_into_the_dependency() {
        let parent = aggregate(HashMap::new());
        let child = aggregate(HashMap::new());
        let dependencies = vec![Dependency::new(
            "backend",
            PathBuf::from("/p/backend"),
            child,
            Vec::new(),
        )];

        let (_, value) = load_runtime_variable(
            "runtime.dependencies.backend.images.app.tag",
            &parent,
            &dependencies,
        )
        .unwrap();
        assert_eq!(value, Value::String("dev-xxx".to_owned()));

        let err = load_runtime_variable(
            "runtime.dependencies.ghost.images.app",
            &parent,
            &dependencies,
        )
        .unwrap_err()
        .to_string();
        assert!(err.contains("make sure the dependency ghost was loaded"));
    }

    #[test]
    fn non_runtime_tokens_resolve_before_runtime_tokens() {
        let mut resolved = HashMap::new();
        resolved.insert("NS".to_owned(), Value::String("staging".to_owned()));
        let config = aggregate(resolved);

        let resolver = RuntimeResolver::new(Path::new("."), false);
        let system = MockSystem::new();
        let mut doc: Value = serde_yaml::from_str(
            "command: deploy ${NS} ${runtime.images.app.tag}\n",
        )
        .unwrap();
        resolver
            .fill_runtime_variables(&system, &mut doc, &config, &[])
            .unwrap();

        assert_eq!(
            doc.get("command"),
            Some(&Value::String("deploy staging dev-xxx".to_owned()))
        );
    }

    #[test]
    fn runtime_resolution_happens_once_per_session() {
        let config = aggregate(HashMap::new());
        let resolver = RuntimeResolver::new(Path::new("."), false);
        let system = MockSystem::new();

        let out = resolver
            .fill_runtime_variables_as_string(&system, "${runtime.images.app.tag}", &config, &[])
            .unwrap();
        assert_eq!(out, "dev-xxx");

        // later lookups come from the session cache, so a changed image
        // cache no longer affects this session
        config.local_cache().set_image_cache(
            "app",
            ImageCache {
                image_name: "ghcr.io/acme/app".to_owned(),
                tag: "changed".to_owned(),
                ..ImageCache::default()
            },
        );
        let out = resolver
            .fill_runtime_variables_as_string(&system, "${runtime.images.app.tag}", &config, &[])
            .unwrap();
        assert_eq!(out, "dev-xxx");
    }

    #[test]
    fn expressions_run_between_the_variable_passes() {
        let config = aggregate(HashMap::new());
        let resolver = RuntimeResolver::new(Path::new("."), false);
        let system = MockSystem::new();

        // the expression emits a runtime token which the last pass resolves
        let out = resolver
            .fill_runtime_variables_as_string(
                &system,
                "$(printf '${runtime.images.app.tag}')",
                &config,
                &[],
            )
            .unwrap();
        assert_eq!(out, "dev-xxx");
    }

    #[test]
    fn legacy_helpers_run_only_when_enabled() {
        let config = aggregate(HashMap::new());
        let system = MockSystem::new();

        let resolver = RuntimeResolver::new(Path::new("."), true);
        let out = resolver
            .fill_runtime_variables_as_string(&system, "image(app)", &config, &[])
            .unwrap();
        assert_eq!(out, "ghcr.io/acme/app");

        let resolver = RuntimeResolver::new(Path::new("."), false);
        let out = resolver
            .fill_runtime_variables_as_string(&system, "image(app)", &config, &[])
            .unwrap();
        assert_eq!(out, "image(app)");
    }

    #[test]
    fn misplaced_runtime_tokens_are_rejected() {
        let mut doc: Value = serde_yaml::from_str(
            "images:\n  app:\n    image: ${runtime.images.app}\n",
        )
        .unwrap();
        let err = check_runtime_variable_placement(&mut doc)
            .unwrap_err()
            .to_string();
        assert!(err.contains("runtime variables are not allowed at images/app/image"));

        let mut doc: Value = serde_yaml::from_str(
            "hooks:\n  - command: echo ${runtime.images.app}\n",
        )
        .unwrap();
        check_runtime_variable_placement(&mut doc).unwrap();
    }
}
