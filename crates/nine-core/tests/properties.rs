//! Property tests for handler normalization and content sniffing.

use nine_core::{detect_content_type, handler, register_handlers, Handler, SNIFF_LEN};
use proptest::prelude::*;

fn noop() -> Handler {
    handler(|_req, _res| Ok(()))
}

proptest! {
    #[test]
    fn last_handler_is_final_and_rest_keep_order(count in 1usize..16) {
        let handlers: Vec<Handler> = (0..count).map(|_| noop()).collect();

        let (last, middlewares) = register_handlers(handlers.clone()).unwrap();

        prop_assert!(last.ptr_eq(&handlers[count - 1]));
        prop_assert_eq!(middlewares.len(), count - 1);
        for (registered, original) in middlewares.iter().zip(&handlers) {
            prop_assert!(registered.ptr_eq(original));
        }
    }

    #[test]
    fn sniffing_accepts_any_bytes(data in prop::collection::vec(any::<u8>(), 0..1024)) {
        let mime = detect_content_type(&data);
        prop_assert!(mime.contains('/'));
    }

    #[test]
    fn sniffing_ignores_bytes_past_the_window(
        head in prop::collection::vec(any::<u8>(), SNIFF_LEN..SNIFF_LEN + 1),
        tail in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let mut data = head.clone();
        data.extend_from_slice(&tail);
        prop_assert_eq!(detect_content_type(&data), detect_content_type(&head));
    }
}
