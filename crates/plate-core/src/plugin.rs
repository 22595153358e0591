use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::conversion::{insert_by_priority, ConversionPipeline, ConvertText, Converter, Priority};
use crate::core::{ApplyError, Editor};
use crate::html::{DataOutput, DataOutputs};
use crate::ops::{ChangesDone, Op};
use crate::paragraph_like::{ParagraphLikeElements, ParagraphLikeError};
use crate::schema::{Schema, SchemaError};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("invalid arguments for `{command}`: {source}")]
    InvalidArgs {
        command: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Apply(#[from] ApplyError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandState {
    #[serde(default)]
    pub value: Value,
    pub is_enabled: bool,
}

impl Default for CommandState {
    fn default() -> Self {
        Self {
            value: Value::Null,
            is_enabled: true,
        }
    }
}

impl CommandState {
    pub fn value_bool(&self) -> bool {
        self.value.as_bool().unwrap_or(false)
    }
}

pub type CommandHandler =
    Arc<dyn Fn(&mut Editor, Option<Value>) -> Result<(), CommandError> + Send + Sync>;
pub type CommandRefresh = Arc<dyn Fn(&Editor) -> CommandState + Send + Sync>;

#[derive(Clone)]
pub struct CommandSpec {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub args_example: Option<Value>,
    pub handler: CommandHandler,
    pub refresh: CommandRefresh,
}

impl CommandSpec {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        handler: impl Fn(&mut Editor, Option<Value>) -> Result<(), CommandError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            keywords: Vec::new(),
            args_example: None,
            handler: Arc::new(handler),
            refresh: Arc::new(|_: &Editor| CommandState::default()),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn args_example(mut self, args_example: Value) -> Self {
        self.args_example = Some(args_example);
        self
    }

    pub fn refresh(mut self, refresh: impl Fn(&Editor) -> CommandState + Send + Sync + 'static) -> Self {
        self.refresh = Arc::new(refresh);
        self
    }
}

pub trait ChangesDoneListener: Send + Sync {
    fn id(&self) -> &'static str;
    fn changes_done(&self, editor: &Editor, event: &ChangesDone) -> Vec<Op>;
}

struct FnListener<F> {
    id: &'static str,
    f: F,
}

impl<F> ChangesDoneListener for FnListener<F>
where
    F: Fn(&Editor, &ChangesDone) -> Vec<Op> + Send + Sync,
{
    fn id(&self) -> &'static str {
        self.id
    }

    fn changes_done(&self, editor: &Editor, event: &ChangesDone) -> Vec<Op> {
        (self.f)(editor, event)
    }
}

pub fn listener_fn<F>(id: &'static str, f: F) -> impl ChangesDoneListener
where
    F: Fn(&Editor, &ChangesDone) -> Vec<Op> + Send + Sync + 'static,
{
    FnListener { id, f }
}

pub trait PlatePlugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn register_schema(&self, _schema: &mut Schema) -> Result<(), SchemaError> {
        Ok(())
    }
    fn converters(&self) -> Vec<(Priority, Converter)> {
        Vec::new()
    }
    fn paragraph_like_elements(&self, _set: &mut ParagraphLikeElements) -> Result<(), ParagraphLikeError> {
        Ok(())
    }
    fn data_outputs(&self) -> Vec<DataOutput> {
        Vec::new()
    }
    fn listeners(&self) -> Vec<(Priority, Box<dyn ChangesDoneListener>)> {
        Vec::new()
    }
    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate plugin id: {0}")]
    DuplicatePlugin(String),
    #[error("duplicate command id: {0}")]
    DuplicateCommand(String),
    #[error("plugin `{plugin}` failed to register its schema: {source}")]
    Schema {
        plugin: String,
        #[source]
        source: SchemaError,
    },
    #[error("plugin `{plugin}` contributed a bad paragraph-like element: {source}")]
    ParagraphLike {
        plugin: String,
        #[source]
        source: ParagraphLikeError,
    },
}

pub type Listeners = Vec<(Priority, Arc<dyn ChangesDoneListener>)>;

#[derive(Default)]
pub struct PluginRegistry {
    plugin_ids: Vec<&'static str>,
    schema: Schema,
    conversion: ConversionPipeline,
    outputs: DataOutputs,
    listeners: Listeners,
    commands: HashMap<String, CommandSpec>,
}

pub(crate) struct RegistryParts {
    pub schema: Schema,
    pub conversion: ConversionPipeline,
    pub outputs: DataOutputs,
    pub listeners: Listeners,
    pub commands: HashMap<String, CommandSpec>,
}

impl PluginRegistry {
    pub fn new(plugins: impl IntoIterator<Item = Box<dyn PlatePlugin>>) -> Result<Self, RegistryError> {
        let mut registry = Self::core();
        for plugin in plugins {
            registry.register_plugin(plugin)?;
        }
        Ok(registry)
    }

    pub fn core() -> Self {
        let mut registry = Self::default();
        registry.plugin_ids.push("core.conversion");
        registry
            .conversion
            .add(Priority::Normal, Converter::Text(Box::new(ConvertText)));
        registry
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn PlatePlugin>) -> Result<(), RegistryError> {
        let id = plugin.id();
        if self.plugin_ids.contains(&id) {
            return Err(RegistryError::DuplicatePlugin(id.to_string()));
        }

        let commands = plugin.commands();
        for cmd in &commands {
            if self.commands.contains_key(&cmd.id) {
                return Err(RegistryError::DuplicateCommand(cmd.id.clone()));
            }
        }

        plugin
            .register_schema(&mut self.schema)
            .map_err(|source| RegistryError::Schema {
                plugin: id.to_string(),
                source,
            })?;

        plugin
            .paragraph_like_elements(self.conversion.paragraph_like_mut())
            .map_err(|source| RegistryError::ParagraphLike {
                plugin: id.to_string(),
                source,
            })?;

        for (priority, converter) in plugin.converters() {
            self.conversion.add(priority, converter);
        }
        for output in plugin.data_outputs() {
            self.outputs.add(output);
        }
        for (priority, listener) in plugin.listeners() {
            insert_by_priority(&mut self.listeners, priority, Arc::from(listener));
        }
        for cmd in commands {
            self.commands.insert(cmd.id.clone(), cmd);
        }

        tracing::debug!(plugin = id, "plugin registered");
        self.plugin_ids.push(id);
        Ok(())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn schema_mut(&mut self) -> &mut Schema {
        &mut self.schema
    }

    pub fn commands(&self) -> &HashMap<String, CommandSpec> {
        &self.commands
    }

    pub(crate) fn into_parts(self) -> RegistryParts {
        RegistryParts {
            schema: self.schema,
            conversion: self.conversion,
            outputs: self.outputs,
            listeners: self.listeners,
            commands: self.commands,
        }
    }
}
