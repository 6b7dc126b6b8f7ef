//! Declarative macros for effect construction.

/// Create an `Effect::Future` from an async block body.
///
/// The body is wrapped in `async move`, so everything it uses must be owned
/// (clone `Arc`s out of the environment before invoking the macro).
///
/// # Example
///
/// ```rust,ignore
/// use ticketpay_core::async_effect;
///
/// let gateway = env.gateway.clone();
/// async_effect! {
///     let charge = gateway.verify_charge(&reference).await;
///     Some(ReconciliationAction::ChargeVerified { charge })
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}
