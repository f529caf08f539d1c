//! Property tests for the pattern transformer and the route table.

use nine_router::{route_pattern, transform_path, RouteTable};
use proptest::prelude::*;

fn segment() -> impl Strategy<Value = (bool, String)> {
    (any::<bool>(), "[a-z][a-z0-9_]{0,7}")
}

proptest! {
    #[test]
    fn colon_params_become_braces_in_order(segments in prop::collection::vec(segment(), 1..6)) {
        let path: String = segments
            .iter()
            .map(|(param, name)| if *param { format!("/:{name}") } else { format!("/{name}") })
            .collect();
        let expected: String = segments
            .iter()
            .map(|(param, name)| if *param { format!("/{{{name}}}") } else { format!("/{name}") })
            .collect();

        prop_assert_eq!(transform_path(&path), expected);
    }

    #[test]
    fn transform_never_leaves_double_slashes(path in "(/{1,3}[a-z:]{0,4}){0,6}") {
        prop_assert!(!transform_path(&path).contains("//"));
    }

    #[test]
    fn transform_is_idempotent(path in "(/[a-z:{}]{0,6}){0,5}") {
        let once = transform_path(&path);
        prop_assert_eq!(transform_path(&once), once.clone());
    }

    #[test]
    fn registered_routes_always_exist(names in prop::collection::vec("[a-z]{1,6}", 1..12), id in "[0-9]{1,5}") {
        let mut table = RouteTable::new();
        for name in &names {
            table.register(route_pattern("GET", &format!("/{name}")), ());
            table.register(route_pattern("GET", &format!("/{name}/:id")), ());
        }

        for name in &names {
            let plain = format!("/{name}");
            let with_id = format!("/{name}/{id}");
            prop_assert!(table.exists("GET", &plain));
            prop_assert!(table.exists("GET", &with_id));
        }
        let first = format!("/{}", names[0]);
        prop_assert!(!table.exists("POST", &first));
    }
}
