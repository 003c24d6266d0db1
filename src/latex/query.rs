use crate::{error::MatchError, latex::tree::{Node, NodeKind}};

/// A command together with the argument group it was matched with.
#[derive(Debug, Clone, Copy)]
pub struct CommandMatch<'n> {
	pub command:  &'n Node,
	pub argument: &'n Node,
}

/// An environment together with the groups following its name.
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentMatch<'n> {
	pub environment: &'n Node,
	pub arguments:   &'n [Node],
}

/// Finds every `\command{..}` in pre-order. A command whose first argument is
/// not a curly group is reported as a soft error for that match only.
pub fn find_commands<'n>(
	root: &'n Node,
	source: &str,
	command: &str,
) -> Vec<Result<CommandMatch<'n>, MatchError>> {
	let bare = command.trim_start_matches('\\');

	root
		.walk()
		.filter_map(Node::as_command)
		.filter(|cmd| cmd.name(source).strip_prefix('\\') == Some(bare))
		.map(|cmd| {
			let name = cmd.name_node().unwrap_or(cmd.node());
			match cmd.arguments().first() {
				Some(argument) if argument.kind() == NodeKind::CurlyGroup => {
					Ok(CommandMatch { command: name, argument })
				}
				_ => Err(MatchError::MissingArgument { command: bare.to_string(), offset: name.start() }),
			}
		})
		.collect()
}

/// Finds every `\begin{name} .. \end{name}` in pre-order.
pub fn find_environments<'n>(root: &'n Node, source: &str, name: &str) -> Vec<EnvironmentMatch<'n>> {
	root
		.walk()
		.filter_map(Node::as_environment)
		.filter(|env| env.name(source) == name)
		.map(|env| EnvironmentMatch { environment: env.node(), arguments: env.arguments() })
		.collect()
}
