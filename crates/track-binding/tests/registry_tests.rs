//! Share surface registry integration tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use track_binding::config::Config;
use track_binding::registry::SurfaceRegistry;

/// Stand-in for a consumer-side surface handle.
#[derive(Debug, PartialEq, Eq)]
struct Surface {
    mesh: &'static str,
}

#[test]
fn test_registry_is_shared_between_consumers() {
    let registry: SurfaceRegistry<Arc<Surface>> = SurfaceRegistry::new();
    let wall = Arc::new(Surface { mesh: "wall-plane" });

    // A surface registers itself; the share picker reads through its own clone
    let picker = registry.clone();
    registry.register("lobby-wall", Arc::clone(&wall));

    assert_eq!(picker.list_keys(), vec!["lobby-wall"]);
    assert!(Arc::ptr_eq(&picker.get("lobby-wall").unwrap(), &wall));
}

#[test]
fn test_last_writer_wins() {
    let registry = SurfaceRegistry::new();
    registry.register("screen", Arc::new(Surface { mesh: "old" }));
    registry.register("screen", Arc::new(Surface { mesh: "new" }));

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get("screen").unwrap().mesh, "new");
}

#[test]
fn test_candidates_use_configured_default() {
    let config = Config::default();
    let registry: SurfaceRegistry<Arc<Surface>> = SurfaceRegistry::new();

    assert_eq!(
        registry.candidates_or(&config.default_share_target),
        vec!["screenshare"]
    );

    registry.register("stage", Arc::new(Surface { mesh: "stage" }));
    registry.register("wall", Arc::new(Surface { mesh: "wall" }));
    registry.unregister("stage");
    assert_eq!(
        registry.candidates_or(&config.default_share_target),
        vec!["wall"]
    );
}

#[test]
fn test_concurrent_registration() {
    let registry: SurfaceRegistry<usize> = SurfaceRegistry::new();

    let threads: Vec<_> = (0..8)
        .map(|i| {
            let registry = registry.clone();
            std::thread::spawn(move || {
                registry.register(&format!("surface-{}", i % 4), i);
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(registry.len(), 4);
    assert_eq!(registry.entries().len(), 4);
}
