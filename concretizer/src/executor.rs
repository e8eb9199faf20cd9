use std::ops::Range;

use tracing::{debug, trace};
use xcb::Template;
use xcb::item::{BlockKind, Directive, Item};
use xcb::token::TokenKind;

use crate::environment::{Environment, Scope};
use crate::error::{DiagnosticError, RuntimeError};
use crate::evaluator::Evaluator;
use crate::helpers::{args_text, dedent, parse_params, split_call_args};
use crate::macros::{Macro, MacroRegistry};
use crate::options::{ErrorPolicy, RenderOptions};
use crate::runtime_value::RuntimeValue;

/// The result of a successful render.
#[derive(Debug)]
pub struct Rendered {
    pub output: String,
    /// Structural warnings recorded under `ErrorPolicy::Continue`.
    pub diagnostics: Vec<DiagnosticError>,
    /// The environment as the render left it. Only the root scope remains.
    pub environment: Environment,
}

/// Render a template with a fresh environment and default options.
pub fn render_template(
    template: &Template,
    evaluator: &mut dyn Evaluator,
) -> Result<Rendered, DiagnosticError> {
    render_template_with(
        template,
        evaluator,
        Environment::new(),
        RenderOptions::default(),
    )
}

/// Render a template against a pre-seeded environment.
pub fn render_template_with(
    template: &Template,
    evaluator: &mut dyn Evaluator,
    environment: Environment,
    options: RenderOptions,
) -> Result<Rendered, DiagnosticError> {
    let mut concretizer = Concretizer {
        evaluator,
        env: environment,
        macros: MacroRegistry::new(),
        output: String::new(),
        diagnostics: Vec::new(),
        source_id: template.source_id,
        source: &template.source,
        options,
        depth: 0,
    };

    for error in &template.diagnostics {
        concretizer.report(DiagnosticError::from(error))?;
    }
    concretizer.eval_items(&template.items)?;

    debug!(
        output_len = concretizer.output.len(),
        macros = ?concretizer.macros.names(),
        diagnostics = concretizer.diagnostics.len(),
        "render finished"
    );
    Ok(Rendered {
        output: concretizer.output,
        diagnostics: concretizer.diagnostics,
        environment: concretizer.env,
    })
}

/// Whether the rest of the current item sequence should run.
enum Flow {
    Continue,
    /// `#($)`: skip the remainder of the innermost sequence.
    Return,
}

struct Concretizer<'e, 's> {
    evaluator: &'e mut dyn Evaluator,
    env: Environment,
    macros: MacroRegistry,
    output: String,
    diagnostics: Vec<DiagnosticError>,
    source_id: usize,
    /// Template text, for exact directive argument text.
    source: &'s str,
    options: RenderOptions,
    /// Current macro expansion nesting.
    depth: usize,
}

impl Concretizer<'_, '_> {
    fn eval_items(&mut self, items: &[Item]) -> Result<Flow, DiagnosticError> {
        for item in items {
            trace!(span = ?item.span(), "item");
            if let Flow::Return = self.eval_item(item)? {
                return Ok(Flow::Return);
            }
        }
        Ok(Flow::Continue)
    }

    fn eval_item(&mut self, item: &Item) -> Result<Flow, DiagnosticError> {
        match item {
            Item::Text { value, .. } => self.output.push_str(value),
            Item::Interpolation { expr, span } => {
                let value = self.evaluate(expr, span)?;
                self.output.push_str(&value.to_string());
            }
            Item::CodeBlock { body, span } => {
                self.evaluator
                    .execute(&dedent(body), &mut self.env)
                    .map_err(|e| self.locate(e, span))?;
            }
            Item::Block {
                kind,
                directive,
                body,
            } => match kind {
                BlockKind::If => self.eval_if(directive, body)?,
                BlockKind::For => self.eval_for(directive, body)?,
                BlockKind::Macro => self.define_macro(directive, body)?,
            },
            Item::Directive(directive) => return self.eval_directive(directive),
        }
        Ok(Flow::Continue)
    }

    fn eval_if(&mut self, directive: &Directive, body: &[Item]) -> Result<(), DiagnosticError> {
        if directive.args.is_empty() {
            return self.structural("'if' directive has no condition", &directive.span);
        }
        let condition = self.evaluate(&args_text(self.source, &directive.args), &directive.span)?;
        if condition.is_truthy() {
            self.eval_items(body)?;
        }
        Ok(())
    }

    fn eval_for(&mut self, directive: &Directive, body: &[Item]) -> Result<(), DiagnosticError> {
        let span = &directive.span;
        let [variable, keyword, iterable @ ..] = directive.args.as_slice() else {
            return self.structural("'for' directive needs a loop variable and a sequence", span);
        };
        if !variable.is(TokenKind::Ident) {
            return self.structural(
                format!("expected loop variable name, found '{}'", variable.text.trim()),
                span,
            );
        }
        if keyword.text != "in" {
            self.structural(
                format!("expected 'in' after loop variable, found '{}'", keyword.text.trim()),
                span,
            )?;
        }
        if iterable.is_empty() {
            return self.structural("'for' directive has no sequence to iterate", span);
        }

        let values = self
            .evaluate(&args_text(self.source, iterable), span)?
            .iterate()
            .map_err(|e| self.locate(e, span))?;
        trace!(variable = %variable.text, count = values.len(), "for loop");

        self.with_scope(Scope::new("for"), |this| {
            for value in values {
                this.env.declare(&variable.text, value);
                this.eval_items(body)?;
            }
            Ok(())
        })
    }

    fn define_macro(&mut self, directive: &Directive, body: &[Item]) -> Result<(), DiagnosticError> {
        let span = &directive.span;
        let Some((name, rest)) = directive.args.split_first() else {
            return self.structural("'macro' directive has no name", span);
        };
        if !name.is(TokenKind::Ident) {
            return self.structural(format!("invalid macro name '{}'", name.text.trim()), span);
        }
        let params = match parse_params(rest) {
            Ok(params) => params,
            Err(message) => {
                self.structural(message, span)?;
                Vec::new()
            }
        };

        debug!(name = %name.text, ?params, "registered macro");
        let replaced = self.macros.register(Macro {
            name: name.text.clone(),
            params,
            body: body.to_vec(),
        });
        if replaced {
            trace!(name = %name.text, "macro redefined");
        }
        Ok(())
    }

    fn eval_directive(&mut self, directive: &Directive) -> Result<Flow, DiagnosticError> {
        if let Some(definition) = self.macros.get(&directive.name) {
            self.expand_macro(&definition, directive)?;
            return Ok(Flow::Continue);
        }

        match directive.name.as_str() {
            "$" if directive.args.is_empty() => return Ok(Flow::Return),
            "$" => {
                let value =
                    self.evaluate(&args_text(self.source, &directive.args), &directive.span)?;
                self.output.push_str(&value.to_string());
            }
            "end" => self.structural(
                format!(
                    "'end {}' does not close any open block",
                    args_text(self.source, &directive.args)
                ),
                &directive.span,
            )?,
            name => self.structural(
                format!("unknown directive or macro '{}'", name),
                &directive.span,
            )?,
        }
        Ok(Flow::Continue)
    }

    fn expand_macro(&mut self, definition: &Macro, directive: &Directive) -> Result<(), DiagnosticError> {
        let span = &directive.span;
        if self.depth >= self.options.max_depth {
            return Err(self.locate(RuntimeError::StackOverflow(self.options.max_depth), span));
        }

        let args = match split_call_args(self.source, &directive.args) {
            Ok(args) => args,
            Err(message) => {
                self.structural(message, span)?;
                Vec::new()
            }
        };
        if args.len() != definition.params.len() {
            self.structural(
                format!(
                    "macro '{}' takes {} argument(s), got {}",
                    definition.name,
                    definition.params.len(),
                    args.len()
                ),
                span,
            )?;
        }

        // Arguments see the caller's bindings, not each other.
        let mut bindings = Vec::with_capacity(args.len());
        for (param, arg) in definition.params.iter().zip(&args) {
            bindings.push((param, self.evaluate(arg, span)?));
        }

        debug!(name = %definition.name, depth = self.depth, "expanding macro");
        self.depth += 1;
        let result = self.with_scope(Scope::new(&definition.name), |this| {
            for (param, value) in bindings {
                this.env.declare(param, value);
            }
            this.eval_items(&definition.body).map(|_| ())
        });
        self.depth -= 1;
        result
    }

    /// Run `f` inside a new innermost scope, popping it however `f` returns.
    fn with_scope<T>(
        &mut self,
        scope: Scope,
        f: impl FnOnce(&mut Self) -> Result<T, DiagnosticError>,
    ) -> Result<T, DiagnosticError> {
        self.env.push_scope(scope);
        let result = f(self);
        self.env.pop_scope();
        result
    }

    /// Evaluate de-indented expression text. Failures are fatal.
    fn evaluate(&mut self, source: &str, span: &Range<usize>) -> Result<RuntimeValue, DiagnosticError> {
        self.evaluator
            .evaluate(&dedent(source), &mut self.env)
            .map_err(|e| self.locate(e, span))
    }

    fn locate(&self, error: RuntimeError, span: &Range<usize>) -> DiagnosticError {
        DiagnosticError::from(error).at(span.clone(), self.source_id)
    }

    fn structural(&mut self, message: impl Into<String>, span: &Range<usize>) -> Result<(), DiagnosticError> {
        self.report(DiagnosticError::warning(
            message.into(),
            span.clone(),
            self.source_id,
        ))
    }

    fn report(&mut self, diagnostic: DiagnosticError) -> Result<(), DiagnosticError> {
        match self.options.policy {
            ErrorPolicy::Continue => {
                debug!(message = %diagnostic, "structural warning");
                self.diagnostics.push(diagnostic);
                Ok(())
            }
            ErrorPolicy::Abort => Err(DiagnosticError {
                is_warning: false,
                ..diagnostic
            }),
        }
    }
}
