//! Actions the model can invoke, and the registry resolving them by name.

mod error;
mod object;
mod registry;

pub use error::{Error, ErrorKind};
pub use object::ToolHandle;
pub use registry::{ToolDescriptor, ToolRegistry, UnknownAction};

/// The result of calling a tool.
pub type ToolResult = Result<String, Error>;

/// A tool that can be called by the model.
///
/// The model invokes a tool by writing an action line, and everything after
/// the tool name up to the end of that line is handed to [`Tool::execute`]
/// verbatim. The returned text becomes the observation the model sees next.
///
/// Implementations of this trait should be stateless, and may not maintain any
/// internal state. Configuration like an endpoint or a model client can be
/// set during initialization and copied into the future when executing.
pub trait Tool: Send + Sync + 'static {
    /// Returns the name of the tool, which is the action name the model
    /// writes.
    fn name(&self) -> &str;

    /// Returns the description of the tool, shown to the model in the
    /// instructions.
    fn description(&self) -> &str;

    /// Executes the tool with the given argument text.
    ///
    /// This method must return a future that is fully independent of `self`,
    /// and the future should be cancellation safe.
    fn execute(
        &self,
        argument: String,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}
