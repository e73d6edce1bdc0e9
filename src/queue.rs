//! Ordered accumulator of pending rendering commands.
//!
//! Every page transform returns its own [`TaskQueue`]; the site orchestrator
//! merges them in page order and runs the result once, at the end of the
//! build. Commands keep the order in which their images were discovered.
//!
//! The same image can appear on several pages. Its commands are identical
//! (same probe results, same widths), so a command for a `(source, width)`
//! pair that is already queued is dropped.

use crate::task::RenderCommand;
use crate::variant::SourcePath;
use std::collections::HashSet;

#[derive(Debug, Default, Clone)]
pub struct TaskQueue {
    commands: Vec<RenderCommand>,
    scheduled: HashSet<(SourcePath, u32)>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command. Returns `false` if an equivalent one was queued.
    pub fn push(&mut self, command: RenderCommand) -> bool {
        let key = (command.source.clone(), command.width);
        if !self.scheduled.insert(key) {
            return false;
        }
        self.commands.push(command);
        true
    }

    pub fn extend(&mut self, commands: impl IntoIterator<Item = RenderCommand>) {
        for command in commands {
            self.push(command);
        }
    }

    /// Append everything from `other`, after the commands already queued.
    pub fn merge(&mut self, other: TaskQueue) {
        self.extend(other.commands);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderCommand> {
        self.commands.iter()
    }

    pub fn into_commands(self) -> Vec<RenderCommand> {
        self.commands
    }
}
