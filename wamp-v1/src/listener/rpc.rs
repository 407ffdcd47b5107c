use std::{
    future::Future,
    panic::AssertUnwindSafe,
    sync::Arc,
};

use anyhow::{
    Error,
    Result,
};
use futures_util::FutureExt;
use log::{
    debug,
    info,
    warn,
};
use serde::{
    Serialize,
    de::DeserializeOwned,
};

use crate::{
    core::{
        error::{
            BasicError,
            InteractionError,
            RpcError,
            error_uri,
        },
        types::Value,
        uri::Uri,
    },
    listener::{
        call::CallKey,
        listener::Listener,
        observer::CallInfo,
        procedure::{
            FnProcedure,
            Invocation,
            Procedure,
            TypedFnProcedure,
            TypedProcedure,
            TypedProcedureAdapter,
        },
        session::Session,
    },
    message::{
        common::call_error_for_error,
        message::{
            CallMessage,
            CallResultMessage,
            Message,
        },
    },
};

impl Listener {
    /// Registers a procedure, replacing any procedure already registered under the same URI.
    ///
    /// Returns `true` if a procedure was replaced.
    pub async fn register_procedure(&self, uri: Uri, procedure: Arc<dyn Procedure>) -> bool {
        let replaced = self.procedures.insert(uri.clone(), procedure).await;
        info!("Registered procedure {uri}");
        replaced
    }

    /// Registers a strongly-typed procedure.
    pub async fn register_typed_procedure<T>(&self, uri: Uri, procedure: T) -> bool
    where
        T: TypedProcedure + 'static,
    {
        self.register_procedure(uri, Arc::new(TypedProcedureAdapter::new(procedure)))
            .await
    }

    /// Registers an asynchronous function as a procedure.
    pub async fn register_fn<F, Fut>(&self, uri: Uri, function: F) -> bool
    where
        F: Fn(Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.register_procedure(uri, Arc::new(FnProcedure::new(function)))
            .await
    }

    /// Registers an asynchronous function with typed input and output as a procedure.
    pub async fn register_typed_fn<F, Fut, I, O>(&self, uri: Uri, function: F) -> bool
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
        I: DeserializeOwned + Send + 'static,
        O: Serialize + Send + 'static,
    {
        self.register_procedure(uri, Arc::new(TypedFnProcedure::new(function)))
            .await
    }

    /// Unregisters a procedure.
    pub async fn unregister_procedure(&self, uri: &Uri) -> bool {
        let removed = self.procedures.remove(uri).await;
        if removed {
            info!("Unregistered procedure {uri}");
        }
        removed
    }

    /// The URIs of all registered procedures.
    pub async fn procedures(&self) -> Vec<Uri> {
        self.procedures.uris().await
    }

    /// The number of calls currently executing.
    pub fn in_flight_calls(&self) -> usize {
        self.calls.len()
    }

    /// Invokes a procedure directly, subject to the configured call timeout.
    pub async fn call(&self, invocation: Invocation) -> Result<Value> {
        let procedure = self
            .procedures
            .get(&invocation.procedure)
            .await
            .ok_or(InteractionError::NoSuchProcedure)?;
        match self.config.call_timeout {
            Some(timeout) => tokio::time::timeout(timeout, procedure.invoke(invocation))
                .await
                .map_err(|_| InteractionError::Timeout)?,
            None => procedure.invoke(invocation).await,
        }
    }

    pub(crate) async fn dispatch_call(self: &Arc<Self>, session: &Arc<Session>, message: CallMessage) {
        let call_id = message.call_id;
        let resolved = session.prefixes().await.resolve(&message.procedure);
        let procedure = match resolved {
            Ok(procedure) => procedure,
            Err(err) => {
                self.respond(session, &call_id, &Err(Error::new(err))).await;
                return;
            }
        };

        let key = CallKey {
            session: session.id().clone(),
            call_id: call_id.clone(),
        };
        if self.calls.contains(&key) {
            self.reject_duplicate_call(session, &call_id).await;
            return;
        }

        let info = CallInfo {
            call_id: call_id.clone(),
            procedure: procedure.clone(),
            session: session.id().clone(),
        };
        if let Err(err) = self.observer.call_invoking(&info).await {
            debug!(
                "Call {call_id} to {procedure} from session {} canceled: {err:#}",
                info.session
            );
            let result = Err(Error::new(InteractionError::Canceled));
            self.respond(session, &call_id, &result).await;
            self.observer.call_invoked(&info, &result).await;
            return;
        }

        let invocation = Invocation {
            call_id: call_id.clone(),
            procedure,
            session: session.id().clone(),
            arguments: message.arguments,
        };
        let listener = self.clone();
        let caller = session.clone();
        let task_key = key.clone();
        let started = self.calls.start(key, async move {
            debug!(
                "Invoking procedure {} for call {} from session {}",
                info.procedure, info.call_id, info.session
            );
            let result = match AssertUnwindSafe(listener.call(invocation))
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        "Procedure {} panicked during call {} from session {}",
                        info.procedure, info.call_id, info.session
                    );
                    Err(Error::new(BasicError::Internal(format!(
                        "procedure {} panicked",
                        info.procedure
                    ))))
                }
            };
            listener.calls.finish(&task_key);
            listener.respond(&caller, &info.call_id, &result).await;
            listener.observer.call_invoked(&info, &result).await;
        });
        if !started {
            self.reject_duplicate_call(session, &call_id).await;
        }
    }

    async fn reject_duplicate_call(&self, session: &Session, call_id: &str) {
        let err = Error::new(BasicError::InvalidArgument(format!(
            "call {call_id} is already in flight"
        )));
        self.respond(session, call_id, &Err(err)).await;
    }

    async fn respond(&self, session: &Session, call_id: &str, result: &Result<Value>) {
        let message = match result {
            Ok(value) => Message::CallResult(CallResultMessage {
                call_id: call_id.to_owned(),
                result: value.clone(),
            }),
            Err(err) => {
                let uri = self.resolve_error_uri(session, err).await;
                debug!(
                    "Call {call_id} from session {} failed with {uri}: {err:#}",
                    session.id()
                );
                call_error_for_error(call_id, uri, err)
            }
        };
        if let Err(err) = self.send(session, &message).await {
            warn!(
                "Failed to respond to call {call_id} from session {}: {err:#}",
                session.id()
            );
        }
    }

    /// Procedures may report errors with CURIEs, which are expanded with the caller's prefixes.
    async fn resolve_error_uri(&self, session: &Session, error: &Error) -> String {
        let uri = error_uri(error);
        if !error.is::<RpcError>() {
            return uri;
        }
        let prefixes = session.prefixes().await;
        if !prefixes.contains_mapping(&uri) {
            return uri;
        }
        match prefixes.resolve(&uri) {
            Ok(resolved) => resolved.into(),
            Err(_) => uri,
        }
    }
}
