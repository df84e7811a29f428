//! Handler system for the Ripple framework.
//!
//! Handlers are plain async functions whose parameters implement
//! [`FromContext`]. The [`Handler`] trait is implemented for them through
//! blanket implementations over each arity, in the style of Axum:
//!
//! ```rust,ignore
//! async fn greet(message: Message, bot: BoxedBot) -> anyhow::Result<()> {
//!     bot.send_message(message.peer_id, "hello").await?;
//!     Ok(())
//! }
//!
//! async fn ask_name(state: StateContext) -> Result<(), StorageError> {
//!     state.set_state("asking_name").await
//! }
//! ```
//!
//! Extraction failures and handler errors both surface as a
//! [`DispatchError`]; neither is swallowed.

use std::collections::HashSet;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::context::HandlerContext;
use crate::error::{BoxError, DispatchError, DispatchResult};
use crate::extractor::FromContext;

/// What a handler invocation resolves to.
pub type HandlerResult = DispatchResult<()>;

/// Return types a handler may have.
pub trait IntoHandlerResult {
    fn into_handler_result(self) -> HandlerResult;
}

impl IntoHandlerResult for () {
    fn into_handler_result(self) -> HandlerResult {
        Ok(())
    }
}

impl<E> IntoHandlerResult for Result<(), E>
where
    E: Into<BoxError>,
{
    fn into_handler_result(self) -> HandlerResult {
        self.map_err(|e| DispatchError::Handler(e.into()))
    }
}

// ============================================================================
// Handler Trait
// ============================================================================

/// An event handler.
///
/// Implemented automatically for async functions taking 0-12 parameters
/// that implement [`FromContext`] and returning `()` or `Result<(), E>`.
pub trait Handler<T>: Clone + Send + Sync + 'static {
    /// The type of future calling this handler returns.
    type Future: Future<Output = HandlerResult> + Send + 'static;

    /// Calls the handler with the given context.
    fn call(self, ctx: Arc<HandlerContext>) -> Self::Future;

    /// Extra-data keys declared by the handler's parameters.
    fn declared_params() -> HashSet<&'static str>;
}

impl<F, Fut> Handler<()> for F
where
    F: FnOnce() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoHandlerResult,
{
    type Future = BoxFuture<'static, HandlerResult>;

    fn call(self, _ctx: Arc<HandlerContext>) -> Self::Future {
        Box::pin(async move { (self)().await.into_handler_result() })
    }

    fn declared_params() -> HashSet<&'static str> {
        HashSet::new()
    }
}

macro_rules! impl_handler {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case)]
        impl<F, Fut, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future + Send + 'static,
            Fut::Output: IntoHandlerResult,
            $( $ty: FromContext + Send + 'static, )*
        {
            type Future = BoxFuture<'static, HandlerResult>;

            fn call(self, ctx: Arc<HandlerContext>) -> Self::Future {
                Box::pin(async move {
                    $(
                        let $ty = $ty::from_context(&ctx)?;
                    )*

                    (self)($($ty,)*).await.into_handler_result()
                })
            }

            fn declared_params() -> HashSet<&'static str> {
                [$($ty::declared_key(),)*].into_iter().flatten().collect()
            }
        }
    };
}

impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);

// ============================================================================
// Type erasure
// ============================================================================

/// Wraps a handler function so it can be stored behind [`ErasedHandler`].
pub struct HandlerFn<F, T> {
    f: F,
    _marker: PhantomData<fn() -> T>,
}

impl<F, T> HandlerFn<F, T> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<F: Clone, T> Clone for HandlerFn<F, T> {
    fn clone(&self) -> Self {
        Self::new(self.f.clone())
    }
}

/// Type-erased handler for dynamic dispatch.
pub trait ErasedHandler: Send + Sync {
    fn call(&self, ctx: Arc<HandlerContext>) -> BoxFuture<'static, HandlerResult>;

    fn declared_params(&self) -> HashSet<&'static str>;
}

impl<F, T> ErasedHandler for HandlerFn<F, T>
where
    F: Handler<T>,
    T: 'static,
{
    fn call(&self, ctx: Arc<HandlerContext>) -> BoxFuture<'static, HandlerResult> {
        let f = self.f.clone();
        Box::pin(f.call(ctx))
    }

    fn declared_params(&self) -> HashSet<&'static str> {
        F::declared_params()
    }
}

/// A type-erased handler that can be stored in collections.
pub type BoxedHandler = Arc<dyn ErasedHandler>;

/// Converts a handler function into a [`BoxedHandler`].
pub fn into_handler<F, T>(f: F) -> BoxedHandler
where
    F: Handler<T>,
    T: 'static,
{
    Arc::new(HandlerFn::new(f))
}
