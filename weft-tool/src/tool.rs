//! The tool contract: metadata, validators and an optional executor.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ToolError, ValidationError};

/// Runs a tool against parsed input.
///
/// Object-safe so tools can be stored as `Arc<dyn ToolExecutor>`.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute the tool.
    async fn execute(&self, input: Value) -> Result<Value, ToolError>;
}

struct FnExecutor<F>(F);

#[async_trait]
impl<F, Fut> ToolExecutor for FnExecutor<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        (self.0)(input).await
    }
}

/// Wrap an async closure as a [`ToolExecutor`].
pub fn tool_fn<F, Fut>(f: F) -> Arc<dyn ToolExecutor>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
    Arc::new(FnExecutor(f))
}

/// Checks a value and returns the (possibly normalised) value to use.
pub trait Validator: Send + Sync {
    /// Validate `value`.
    fn validate(&self, value: &Value) -> Result<Value, ValidationError>;
}

impl<F> Validator for F
where
    F: Fn(&Value) -> Result<Value, ValidationError> + Send + Sync,
{
    fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        self(value)
    }
}

/// What a model is told about a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the input.
    pub input_schema: Value,
}

/// A tool available to the model for one turn.
///
/// A tool without an executor is resolved by the client: the manager
/// announces it with a `tool-input-available` chunk and the result is fed
/// back through the stream processor.
#[derive(Clone)]
pub struct Tool {
    name: String,
    description: String,
    input_schema: Value,
    needs_approval: bool,
    input_validator: Option<Arc<dyn Validator>>,
    output_validator: Option<Arc<dyn Validator>>,
    executor: Option<Arc<dyn ToolExecutor>>,
}

impl Tool {
    /// A tool with an empty object schema and no executor.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: serde_json::json!({"type": "object"}),
            needs_approval: false,
            input_validator: None,
            output_validator: None,
            executor: None,
        }
    }

    /// Set the input JSON Schema.
    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Require a human decision before every execution.
    pub fn with_approval(mut self) -> Self {
        self.needs_approval = true;
        self
    }

    /// Validate input before execution.
    pub fn with_input_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.input_validator = Some(Arc::new(validator));
        self
    }

    /// Validate output after execution.
    pub fn with_output_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.output_validator = Some(Arc::new(validator));
        self
    }

    /// Set the executor.
    pub fn with_executor(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Set an async closure as the executor.
    pub fn execute_with<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        self.with_executor(tool_fn(f))
    }

    /// Tool name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tool description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether every call must be approved first.
    pub fn needs_approval(&self) -> bool {
        self.needs_approval
    }

    /// Whether the tool runs locally.
    pub fn has_executor(&self) -> bool {
        self.executor.is_some()
    }

    /// The model-facing definition.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }

    /// Apply the input validator, if any.
    pub fn validate_input(&self, input: Value) -> Result<Value, ToolError> {
        match &self.input_validator {
            Some(v) => v
                .validate(&input)
                .map_err(|e| ToolError::InvalidInput(e.message)),
            None => Ok(input),
        }
    }

    /// Run the executor and the output validator.
    ///
    /// A tool without an executor reports [`ToolError::NotFound`].
    pub async fn run(&self, input: Value) -> Result<Value, ToolError> {
        let executor = self
            .executor
            .as_ref()
            .ok_or_else(|| ToolError::NotFound(self.name.clone()))?;
        let output = executor.execute(input).await?;
        match &self.output_validator {
            Some(v) => v
                .validate(&output)
                .map_err(|e| ToolError::InvalidOutput(e.message)),
            None => Ok(output),
        }
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("needs_approval", &self.needs_approval)
            .field("has_executor", &self.executor.is_some())
            .field("input_validator", &self.input_validator.is_some())
            .field("output_validator", &self.output_validator.is_some())
            .finish()
    }
}
