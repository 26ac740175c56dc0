//! Purpose: Render a sealed session into markdown transcript text.
//! Exports: `render`, `append_provenance`, `fetch_identity`, `EMPTY_OUTPUT_MARKER`.
//! Role: Pure formatting over recorded steps, plus the one version lookup for the footer.
//! Invariants: Rendering reads steps only; the same session always renders to the same bytes.
//! Invariants: Suppressed steps emit a command block and no output block.
use crate::core::error::{Error, ErrorKind};
use crate::core::exec::{CommandLine, Execute};
use crate::core::session::{CommandStep, Step, run_checked};

pub const EMPTY_OUTPUT_MARKER: &str = "(no output)";

const SHELL_FENCE: &str = "```shell";
const FENCE: &str = "```";

pub fn render(steps: &[Step]) -> String {
    let mut out = String::new();
    for step in steps {
        match step {
            Step::Documentation { text } => {
                out.push_str(text.trim_end_matches(['\n', '\r']));
                out.push_str("\n\n");
            }
            Step::Command(command) => render_command(command, &mut out),
        }
    }
    out
}

fn render_command(step: &CommandStep, out: &mut String) {
    push_block(out, SHELL_FENCE, &step.command.to_string());
    if !step.suppress_output {
        let body = if step.captured_output.is_empty() {
            EMPTY_OUTPUT_MARKER
        } else {
            step.captured_output.as_str()
        };
        push_block(out, FENCE, body);
    }
    if step.exit_code != 0 {
        out.push_str(&format!("Exit code: {}\n\n", step.exit_code));
    }
}

fn push_block(out: &mut String, open: &str, body: &str) {
    out.push_str(open);
    out.push('\n');
    out.push_str(body);
    out.push('\n');
    out.push_str(FENCE);
    out.push_str("\n\n");
}

pub fn append_provenance(mut doc: String, identity: &str) -> String {
    doc.push_str(&format!("Generated using build `{identity}`.\n"));
    doc
}

/// Asks the target for its build identity (e.g. `tool --version`).
pub fn fetch_identity<E: Execute>(executor: &E, command: &CommandLine) -> Result<String, Error> {
    let result = run_checked(executor, command, false)?;
    let identity = result.output.trim();
    if identity.is_empty() {
        return Err(Error::new(ErrorKind::StepFailed)
            .with_message("version command printed nothing")
            .with_command(command.to_string())
            .with_exit_code(result.exit_code));
    }
    Ok(identity.to_string())
}
