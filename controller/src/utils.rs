use std::fmt::Debug;

use futures::future::BoxFuture;
use futures::prelude::*;

pub trait ControllerStreamExt<'a> {
    /// Drains the controller stream, logging each reconcile result.
    fn wait(self) -> BoxFuture<'a, ()>;
}

impl<'a, T, O, E> ControllerStreamExt<'a> for T
where
    T: Stream<Item = Result<O, E>> + Send + 'a,
    O: Debug,
    E: std::error::Error,
{
    fn wait(self) -> BoxFuture<'a, ()> {
        self.for_each_concurrent(None, |result| {
            match result {
                Ok(reconciled) => tracing::trace!("Reconciled {reconciled:?}"),
                Err(err) => tracing::warn!(error = %err, "Controller error"),
            }
            futures::future::ready(())
        })
        .boxed()
    }
}
