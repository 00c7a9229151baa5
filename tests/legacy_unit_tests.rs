//! Unit tests for legacy image()/tag() helper resolution

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use devrig::cache::{ImageCache, LocalCache, RemoteCache};
    use devrig::config::{ConfigAggregate, ImageConfig, ImageNameTag, RigConfig};
    use devrig::legacy;
    use devrig::system::mock::MockSystem;
    use serde_yaml::Value;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Arc;

    fn aggregate(images: &[(&str, &str, &[&str])]) -> ConfigAggregate {
        let mut parsed = RigConfig::default();
        for (key, image, tags) in images {
            parsed.images.insert(
                (*key).to_owned(),
                ImageConfig {
                    image: (*image).to_owned(),
                    tags: tags.iter().map(|t| (*t).to_owned()).collect(),
                    ..ImageConfig::default()
                },
            );
        }

        let system = MockSystem::new();
        ConfigAggregate::new(
            Value::Null,
            parsed,
            HashMap::new(),
            Arc::new(LocalCache::empty(Path::new("/p/.devrig/cache.yaml"))),
            Arc::new(RemoteCache::load(&system, Path::new("/p/.devrig/remote.yaml"))),
            Path::new("/p/devrig.yaml"),
        )
    }

    #[test]
    fn image_helper_resolves_by_config_key() {
        let config = aggregate(&[("app", "ghcr.io/acme/app", &[])]);
        let (_, resolved) = legacy::replace("image(app)", &config, &[]).unwrap();
        assert_eq!(resolved, Value::String("ghcr.io/acme/app".to_owned()));
    }

    #[test]
    fn quoted_helper_arguments_are_accepted() {
        let config = aggregate(&[("app", "ghcr.io/acme/app", &[])]);
        let (_, resolved) = legacy::replace(r#"image("app")"#, &config, &[]).unwrap();
        assert_eq!(resolved, Value::String("ghcr.io/acme/app".to_owned()));

        let (_, resolved) = legacy::replace("image('app')", &config, &[]).unwrap();
        assert_eq!(resolved, Value::String("ghcr.io/acme/app".to_owned()));
    }

    #[test]
    fn tag_helper_uses_the_first_static_tag() {
        let config = aggregate(&[("app", "ghcr.io/acme/app", &["dev-#####", "extra"])]);
        let (_, resolved) = legacy::replace("image(app):tag(app)", &config, &[]).unwrap();
        // '#' placeholders render as 'x' in static tags
        assert_eq!(
            resolved,
            Value::String("ghcr.io/acme/app:dev-xxxxx".to_owned())
        );
    }

    #[test]
    fn tag_helper_falls_back_to_latest() {
        let config = aggregate(&[("app", "ghcr.io/acme/app", &[])]);
        let (_, resolved) = legacy::replace("tag(app)", &config, &[]).unwrap();
        assert_eq!(resolved, Value::String("latest".to_owned()));
    }

    #[test]
    fn unknown_helpers_pass_through_silently() {
        let config = aggregate(&[("app", "ghcr.io/acme/app", &[])]);
        let (redeploy, resolved) =
            legacy::replace("image(test2):tag(test2)", &config, &[]).unwrap();
        assert!(!redeploy);
        assert_eq!(
            resolved,
            Value::String("image(test2):tag(test2)".to_owned())
        );
    }

    #[test]
    fn plain_image_names_resolve_whole_string() {
        let config = aggregate(&[("app", "ghcr.io/acme/app", &["v2"])]);
        let (_, resolved) = legacy::replace("ghcr.io/acme/app", &config, &[]).unwrap();
        assert_eq!(
            resolved,
            Value::String("ghcr.io/acme/app:v2".to_owned())
        );
    }

    #[test]
    fn cache_entries_win_over_static_config() {
        let config = aggregate(&[("app", "ghcr.io/acme/app", &["static"])]);
        config.local_cache().set_image_cache(
            "app",
            ImageCache {
                image_name: "ghcr.io/acme/app".to_owned(),
                tag: "built-123".to_owned(),
                ..ImageCache::default()
            },
        );

        let (_, resolved) = legacy::replace("image(app):tag(app)", &config, &[]).unwrap();
        assert_eq!(
            resolved,
            Value::String("ghcr.io/acme/app:built-123".to_owned())
        );
    }

    #[test]
    fn local_registry_name_is_preferred() {
        let config = aggregate(&[("app", "ghcr.io/acme/app", &[])]);
        config.local_cache().set_image_cache(
            "app",
            ImageCache {
                image_name: "ghcr.io/acme/app".to_owned(),
                local_registry_image_name: "localhost:5000/app".to_owned(),
                tag: "t1".to_owned(),
                ..ImageCache::default()
            },
        );

        let (_, resolved) = legacy::replace("image(app)", &config, &[]).unwrap();
        assert_eq!(resolved, Value::String("localhost:5000/app".to_owned()));
    }

    #[test]
    fn built_images_trigger_redeploy() {
        let config = aggregate(&[("app", "ghcr.io/acme/app", &["v1"])]);
        config.set_built_image(
            "app",
            ImageNameTag {
                image_name: "ghcr.io/acme/app".to_owned(),
                tag: "v1".to_owned(),
            },
        );

        let (redeploy, _) = legacy::replace("image(app)", &config, &[]).unwrap();
        assert!(redeploy);

        let (redeploy, _) = legacy::replace("not-an-image", &config, &[]).unwrap();
        assert!(!redeploy);
    }
}
