use crate::command::{Command, CommandKind};
use crate::failure::Failure;
use crate::middleware::{Middleware, Next};
use crate::response::{Flow, Reply, Response};

/// Converts the executor's result into the transport payload.
///
/// Absent result ⇒ 204, present result ⇒ 200 with the serialized payload.
/// Responses produced further down (short-circuits) pass through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseRenderer;

impl<K: CommandKind> Middleware<K> for ResponseRenderer {
    fn handle(&self, command: &mut Command<K>, next: Next<'_, K>) -> Flow {
        match next.run(command)? {
            Reply::Pending => render(command).map(Reply::Rendered),
            rendered => Ok(rendered),
        }
    }
}

fn render<K: CommandKind>(command: &Command<K>) -> Result<Response, Failure> {
    match command.result() {
        None => Ok(Response::no_content()),
        Some(output) => serde_json::to_value(output)
            .map(Response::ok)
            .map_err(|e| Failure::unclassified(format!("failed to serialize {} result: {e}", K::KIND))),
    }
}
