//! Schema/owner templating for command lists.
//!
//! Engines that need every object qualified with an explicit namespace and
//! owning role keep their statements as templates over `{{ schema }}` and
//! `{{ owner }}`. Rendering happens once, before the list reaches the
//! engine, so the engine itself never looks inside SQL text.

use crate::command::{CommandKind, MigrationCommand, AUTO_REVISION};
use crate::error::{CoreError, CoreResult};
use minijinja::{context, Environment, UndefinedBehavior};

/// Values substituted into command templates
pub struct TemplateContext {
    pub schema: String,
    pub owner: String,
    /// Session setup prepended to every rendered statement
    pub preamble: Option<String>,
    env: Environment<'static>,
}

impl TemplateContext {
    pub fn new(schema: impl Into<String>, owner: impl Into<String>) -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        Self {
            schema: schema.into(),
            owner: owner.into(),
            preamble: None,
            env,
        }
    }

    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    /// Render one template string; unknown placeholders are an error
    pub fn render(&self, name: &str, template: &str) -> CoreResult<String> {
        self.env
            .render_str(template, context! { schema => &self.schema, owner => &self.owner })
            .map_err(|e| CoreError::TemplateRender {
                name: name.to_string(),
                message: e.to_string(),
            })
    }
}

impl std::fmt::Debug for TemplateContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateContext")
            .field("schema", &self.schema)
            .field("owner", &self.owner)
            .field("preamble", &self.preamble)
            .finish()
    }
}

/// Replace [`AUTO_REVISION`] with a running counter.
///
/// An auto command takes the counter and bumps it; an explicit revision
/// moves the counter to one past itself. The counter runs across the whole
/// list and does not restart per version.
pub fn assign_revisions<C>(commands: &mut [MigrationCommand<C>]) {
    let mut next = 0;
    for cmd in commands.iter_mut() {
        if cmd.revision == AUTO_REVISION {
            cmd.revision = next;
            next += 1;
        } else {
            next = cmd.revision + 1;
        }
    }
}

/// Render every raw statement and assign pending revisions.
///
/// The rendered statement (without preamble) becomes the command name.
/// With `with_preamble` false the setup text is left off, for statements
/// that must run outside a session on the target database.
pub fn render_commands<C>(
    ctx: &TemplateContext,
    mut commands: Vec<MigrationCommand<C>>,
    with_preamble: bool,
) -> CoreResult<Vec<MigrationCommand<C>>> {
    assign_revisions(&mut commands);

    for cmd in commands.iter_mut() {
        if let CommandKind::RawStatement(template) = &cmd.kind {
            let body = ctx.render(&cmd.name, template)?;
            let sql = match (&ctx.preamble, with_preamble) {
                (Some(preamble), true) => format!("{preamble}{body}"),
                _ => body.clone(),
            };
            cmd.name = body;
            cmd.kind = CommandKind::RawStatement(sql);
        }
    }

    Ok(commands)
}

#[cfg(test)]
#[path = "template_test.rs"]
mod tests;
