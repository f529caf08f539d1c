//! Handler normalization.
//!
//! Registration methods take "some handlers": nothing, one handler, a tuple
//! of middlewares followed by a handler, a vector, or values whose type is
//! only known at runtime. [`IntoHandlers`] turns all of these into one list
//! of [`Handler`]s and [`register_handlers`] splits that list into the final
//! handler and the middlewares in front of it.

use std::any::{type_name, Any};
use std::fmt;

use crate::error::RegistrationError;
use crate::handler::{ContextFn, DirectFn, Handler, HandlerKind, HandlerWithContext};

/// A handler candidate whose type is checked at registration time.
///
/// # Example
///
/// ```rust
/// use nine_core::{handler, register_handlers, DynHandler, RegistrationError};
///
/// let handlers = vec![
///     DynHandler::new(handler(|_req, _res| Ok(()))),
///     DynHandler::new("not a handler"),
/// ];
/// let err = register_handlers(handlers).unwrap_err();
/// assert!(matches!(err, RegistrationError::FinalHandler { .. }));
/// ```
pub struct DynHandler {
    value: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl DynHandler {
    /// Wraps any value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_name: type_name::<T>(),
        }
    }

    /// Returns the name of the wrapped type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Converts the wrapped value into a [`Handler`].
    ///
    /// # Errors
    ///
    /// Fails with [`RegistrationError::InvalidHandler`] unless the value is
    /// a [`Handler`], [`HandlerWithContext`], [`HandlerKind`], [`DirectFn`]
    /// or [`ContextFn`].
    pub fn validate(self) -> Result<Handler, RegistrationError> {
        let type_name = self.type_name;
        let value = self.value;

        let value = match value.downcast::<Handler>() {
            Ok(h) => return Ok(*h),
            Err(value) => value,
        };
        let value = match value.downcast::<HandlerWithContext>() {
            Ok(h) => return Ok(h.handler()),
            Err(value) => value,
        };
        let value = match value.downcast::<HandlerKind>() {
            Ok(kind) => return Ok(kind.into_handler()),
            Err(value) => value,
        };
        let value = match value.downcast::<DirectFn>() {
            Ok(f) => return Ok(Handler::new(*f)),
            Err(value) => value,
        };
        match value.downcast::<ContextFn>() {
            Ok(f) => Ok(HandlerWithContext::new(*f).handler()),
            Err(_) => Err(RegistrationError::InvalidHandler {
                type_name: type_name.to_string(),
            }),
        }
    }
}

impl fmt::Debug for DynHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynHandler")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Checks that `value` is one of the accepted handler shapes.
///
/// Closures are not accepted directly; wrap them with
/// [`handler`](crate::handler()) or [`with_context`](crate::with_context)
/// first.
///
/// # Errors
///
/// Fails with [`RegistrationError::InvalidHandler`] naming the type of
/// `value`.
pub fn validate_handler<T: Any + Send + Sync>(value: T) -> Result<Handler, RegistrationError> {
    DynHandler::new(value).validate()
}

/// Values that can be registered as a list of handlers.
///
/// The last handler of the list answers the request; the ones before it run
/// first, in order, as middlewares.
pub trait IntoHandlers {
    /// Normalizes `self` to handlers, in order.
    ///
    /// # Errors
    ///
    /// Fails if a dynamically typed entry is not a handler.
    fn into_handlers(self) -> Result<Vec<Handler>, RegistrationError>;
}

impl IntoHandlers for () {
    fn into_handlers(self) -> Result<Vec<Handler>, RegistrationError> {
        Ok(Vec::new())
    }
}

macro_rules! impl_into_handlers_for_shape {
    ($($shape:ty),+) => {
        $(
            impl IntoHandlers for $shape {
                fn into_handlers(self) -> Result<Vec<Handler>, RegistrationError> {
                    Ok(vec![HandlerKind::from(self).into_handler()])
                }
            }
        )+
    };
}

impl_into_handlers_for_shape!(Handler, HandlerWithContext, HandlerKind, DirectFn, ContextFn);

macro_rules! impl_into_handlers_for_tuple {
    ($($name:ident),+) => {
        impl<$($name),+> IntoHandlers for ($($name,)+)
        where
            $($name: Into<HandlerKind>),+
        {
            #[allow(non_snake_case)]
            fn into_handlers(self) -> Result<Vec<Handler>, RegistrationError> {
                let ($($name,)+) = self;
                Ok(vec![$(Into::<HandlerKind>::into($name).into_handler()),+])
            }
        }
    };
}

impl_into_handlers_for_tuple!(A);
impl_into_handlers_for_tuple!(A, B);
impl_into_handlers_for_tuple!(A, B, C);
impl_into_handlers_for_tuple!(A, B, C, D);
impl_into_handlers_for_tuple!(A, B, C, D, E);
impl_into_handlers_for_tuple!(A, B, C, D, E, F);

impl IntoHandlers for Vec<Handler> {
    fn into_handlers(self) -> Result<Vec<Handler>, RegistrationError> {
        Ok(self)
    }
}

impl<const N: usize> IntoHandlers for [Handler; N] {
    fn into_handlers(self) -> Result<Vec<Handler>, RegistrationError> {
        Ok(self.into())
    }
}

impl IntoHandlers for Vec<HandlerKind> {
    fn into_handlers(self) -> Result<Vec<Handler>, RegistrationError> {
        Ok(self.into_iter().map(HandlerKind::into_handler).collect())
    }
}

impl IntoHandlers for Vec<DynHandler> {
    fn into_handlers(self) -> Result<Vec<Handler>, RegistrationError> {
        let last = self.len().saturating_sub(1);
        self.into_iter()
            .enumerate()
            .map(|(position, candidate)| {
                candidate.validate().map_err(|err| {
                    let source = Box::new(err);
                    if position == last {
                        RegistrationError::FinalHandler { source }
                    } else {
                        RegistrationError::Middleware { position, source }
                    }
                })
            })
            .collect()
    }
}

/// Splits a handler list into the final handler and its middlewares.
///
/// # Errors
///
/// - [`RegistrationError::PutAHandler`] when the list is empty.
/// - [`RegistrationError::Middleware`] or [`RegistrationError::FinalHandler`]
///   when a dynamically typed entry is rejected.
///
/// # Example
///
/// ```rust
/// use nine_core::{handler, register_handlers, RegistrationError};
///
/// let auth = handler(|_req, _res| Ok(()));
/// let show = handler(|_req, res| res.send("ok"));
///
/// let (last, middlewares) = register_handlers((auth.clone(), show.clone())).unwrap();
/// assert!(last.ptr_eq(&show));
/// assert!(middlewares[0].ptr_eq(&auth));
///
/// assert_eq!(register_handlers(()).unwrap_err(), RegistrationError::PutAHandler);
/// ```
pub fn register_handlers(
    handlers: impl IntoHandlers,
) -> Result<(Handler, Vec<Handler>), RegistrationError> {
    let mut handlers = handlers.into_handlers()?;
    let last = handlers.pop().ok_or(RegistrationError::PutAHandler)?;
    Ok((last, handlers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::handler::{handler, with_context, HandlerResult};
    use crate::request::Request;
    use crate::response::Response;

    fn plain(_req: &Request, _res: &mut Response<'_>) -> HandlerResult {
        Ok(())
    }

    fn contextual(_c: &mut Context<'_, '_>) -> HandlerResult {
        Ok(())
    }

    #[test]
    fn test_validate_accepts_every_shape() {
        assert!(validate_handler(handler(|_req, _res| Ok(()))).is_ok());
        assert!(validate_handler(with_context(|_c| Ok(()))).is_ok());
        assert!(validate_handler(HandlerKind::from(plain as DirectFn)).is_ok());
        assert!(validate_handler(plain as DirectFn).is_ok());
        assert!(validate_handler(contextual as ContextFn).is_ok());
    }

    #[test]
    fn test_validate_rejects_other_types() {
        let err = validate_handler("not a handler").unwrap_err();
        assert_eq!(
            err,
            RegistrationError::InvalidHandler {
                type_name: "&str".to_string()
            }
        );
        assert!(err.to_string().starts_with("invalid handler type: &str"));

        assert!(validate_handler(42_u32).is_err());
    }

    #[test]
    fn test_validated_handler_is_the_same_closure() {
        let h = handler(|_req, _res| Ok(()));
        let validated = validate_handler(h.clone()).unwrap();
        assert!(validated.ptr_eq(&h));
    }

    #[test]
    fn test_register_zero_handlers() {
        assert_eq!(
            register_handlers(()).unwrap_err(),
            RegistrationError::PutAHandler
        );
        assert_eq!(
            register_handlers(Vec::<Handler>::new()).unwrap_err(),
            RegistrationError::PutAHandler
        );
    }

    #[test]
    fn test_register_keeps_middleware_order() {
        let mw1 = handler(|_req, _res| Ok(()));
        let mw2 = handler(|_req, _res| Ok(()));
        let last = handler(|_req, _res| Ok(()));

        let (final_handler, middlewares) =
            register_handlers((mw1.clone(), mw2.clone(), last.clone())).unwrap();

        assert!(final_handler.ptr_eq(&last));
        assert_eq!(middlewares.len(), 2);
        assert!(middlewares[0].ptr_eq(&mw1));
        assert!(middlewares[1].ptr_eq(&mw2));
    }

    #[test]
    fn test_register_single_handler() {
        let (_, middlewares) = register_handlers(plain as DirectFn).unwrap();
        assert!(middlewares.is_empty());
    }

    #[test]
    fn test_register_mixed_tuple() {
        let (_, middlewares) = register_handlers((
            with_context(|_c| Ok(())),
            contextual as ContextFn,
            plain as DirectFn,
        ))
        .unwrap();
        assert_eq!(middlewares.len(), 2);
    }

    #[test]
    fn test_dynamic_middleware_error_has_position() {
        let handlers = vec![
            DynHandler::new(handler(|_req, _res| Ok(()))),
            DynHandler::new(7_i32),
            DynHandler::new(handler(|_req, _res| Ok(()))),
        ];
        let err = register_handlers(handlers).unwrap_err();

        match &err {
            RegistrationError::Middleware { position, .. } => assert_eq!(*position, 1),
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().starts_with("middleware at position 1: invalid handler type: i32"));
    }

    #[test]
    fn test_dynamic_final_handler_error() {
        let handlers = vec![DynHandler::new(String::from("nope"))];
        let err = register_handlers(handlers).unwrap_err();
        assert!(err.to_string().starts_with("final handler: invalid handler type: alloc::string::String"));
    }

    #[test]
    fn test_dyn_handler_reports_type_name() {
        assert_eq!(DynHandler::new(1_u8).type_name(), "u8");
    }
}
