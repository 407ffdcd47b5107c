use std::{
    future::Future,
    marker::PhantomData,
    sync::Arc,
};

use anyhow::{
    Error,
    Result,
};
use async_trait::async_trait;
use serde::{
    Serialize,
    de::DeserializeOwned,
};
use tokio::sync::RwLock;

use crate::core::{
    error::ArgumentMismatchError,
    hash::HashMap,
    id::SessionId,
    types::{
        List,
        Value,
    },
    uri::Uri,
};

/// A single invocation of a procedure.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// The call ID chosen by the caller.
    pub call_id: String,
    /// The resolved procedure URI.
    pub procedure: Uri,
    /// The calling session.
    pub session: SessionId,
    /// Positional arguments.
    pub arguments: List,
}

/// A procedure that responds to any given invocation with some result.
///
/// Return an [`crate::core::error::RpcError`] to answer the caller with a specific error URI.
#[async_trait]
pub trait Procedure: Send + Sync {
    /// Invokes the procedure.
    async fn invoke(&self, invocation: Invocation) -> Result<Value>;
}

/// A strongly-typed procedure that generates some output based on some input.
///
/// Arguments are checked against [`Self::Input`] before the procedure runs.
#[async_trait]
pub trait TypedProcedure: Send + Sync {
    /// Positional arguments from the caller, usually a tuple.
    ///
    /// Procedures without arguments take `()`.
    type Input: DeserializeOwned + Send;

    /// Output to the caller.
    type Output: Serialize + Send;

    /// Invokes the procedure and produces a result.
    async fn invoke(&self, input: Self::Input) -> Result<Self::Output>;
}

/// Decodes positional arguments to a strongly-typed input.
///
/// Fails if the number or types of the arguments do not match.
pub fn decode_arguments<T>(procedure: &Uri, arguments: List) -> Result<T, ArgumentMismatchError>
where
    T: DeserializeOwned,
{
    if arguments.is_empty() {
        if let Ok(input) = serde_json::from_value(Value::Null) {
            return Ok(input);
        }
    }
    serde_json::from_value(Value::Array(arguments)).map_err(|err| ArgumentMismatchError {
        procedure: procedure.clone(),
        message: err.to_string(),
    })
}

fn encode_output<T>(output: T) -> Result<Value>
where
    T: Serialize,
{
    serde_json::to_value(output).map_err(Error::new)
}

/// Wraps a [`TypedProcedure`] as an untyped [`Procedure`].
pub struct TypedProcedureAdapter<T> {
    procedure: T,
}

impl<T> TypedProcedureAdapter<T> {
    pub fn new(procedure: T) -> Self {
        Self { procedure }
    }
}

#[async_trait]
impl<T> Procedure for TypedProcedureAdapter<T>
where
    T: TypedProcedure,
{
    async fn invoke(&self, invocation: Invocation) -> Result<Value> {
        let input = decode_arguments(&invocation.procedure, invocation.arguments)?;
        encode_output(self.procedure.invoke(input).await?)
    }
}

/// A [`Procedure`] implemented by an asynchronous function.
pub struct FnProcedure<F> {
    function: F,
}

impl<F> FnProcedure<F> {
    pub fn new(function: F) -> Self {
        Self { function }
    }
}

#[async_trait]
impl<F, Fut> Procedure for FnProcedure<F>
where
    F: Fn(Invocation) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    async fn invoke(&self, invocation: Invocation) -> Result<Value> {
        (self.function)(invocation).await
    }
}

/// A [`Procedure`] implemented by an asynchronous function with typed input and output.
pub struct TypedFnProcedure<F, I, O> {
    function: F,
    _types: PhantomData<fn(I) -> O>,
}

impl<F, I, O> TypedFnProcedure<F, I, O> {
    pub fn new<Fut>(function: F) -> Self
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<O>>,
    {
        Self {
            function,
            _types: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut, I, O> Procedure for TypedFnProcedure<F, I, O>
where
    F: Fn(I) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O>> + Send + 'static,
    I: DeserializeOwned + Send + 'static,
    O: Serialize + Send + 'static,
{
    async fn invoke(&self, invocation: Invocation) -> Result<Value> {
        let input = decode_arguments(&invocation.procedure, invocation.arguments)?;
        encode_output((self.function)(input).await?)
    }
}

/// The registry of procedures that can be called by sessions.
#[derive(Default)]
pub struct ProcedureManager {
    procedures: RwLock<HashMap<Uri, Arc<dyn Procedure>>>,
}

impl ProcedureManager {
    /// Registers a procedure, replacing any existing procedure with the same URI.
    ///
    /// Returns `true` if a procedure was replaced.
    pub async fn insert(&self, uri: Uri, procedure: Arc<dyn Procedure>) -> bool {
        self.procedures.write().await.insert(uri, procedure).is_some()
    }

    /// Unregisters a procedure.
    pub async fn remove(&self, uri: &Uri) -> bool {
        self.procedures.write().await.remove(uri).is_some()
    }

    /// Looks up a procedure.
    pub async fn get(&self, uri: &Uri) -> Option<Arc<dyn Procedure>> {
        self.procedures.read().await.get(uri).cloned()
    }

    /// The URIs of all registered procedures.
    pub async fn uris(&self) -> Vec<Uri> {
        self.procedures.read().await.keys().cloned().collect()
    }
}
