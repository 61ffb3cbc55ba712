//! Interactive REPL over a [`BrowserSession`].
//!
//! Launch with `pjax-shell open <url>`. Type `/help` for available commands,
//! Tab for completion.

use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, ConditionalEventHandler, Config, Editor, Event, EventContext, EventHandler, Helper,
    KeyEvent, RepeatCount,
};
use tokio::runtime::Handle;

use pjax::{NavigationOutcome, PjaxEvent};

use crate::session::{BrowserSession, Traversal};

/// Available REPL commands.
const COMMANDS: &[(&str, &str)] = &[
    ("/links", "List links on the page"),
    ("/click", "Click link <n>"),
    ("/back", "Go back one history entry"),
    ("/forward", "Go forward one history entry"),
    ("/show", "Print the markup of [selector]"),
    ("/title", "Print the document title and address"),
    ("/history", "List session history entries"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the REPL"),
];

/// REPL helper for tab completion.
#[derive(Default)]
struct ShellHelper;

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];
        if input.contains(' ') {
            return Ok((pos, Vec::new()));
        }

        let matches = COMMANDS
            .iter()
            .filter(|(cmd, _)| cmd.starts_with(input))
            .map(|(cmd, desc)| Pair {
                display: format!("{cmd:<12} {desc}"),
                replacement: format!("{cmd} "),
            })
            .collect();
        Ok((0, matches))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || !line.starts_with('/') || line.contains(' ') {
            return None;
        }
        COMMANDS
            .iter()
            .find(|(cmd, _)| cmd.starts_with(line) && *cmd != line)
            .map(|(cmd, _)| cmd[line.len()..].to_string())
    }
}

impl Highlighter for ShellHelper {}
impl Validator for ShellHelper {}
impl Helper for ShellHelper {}

struct TabCompleteOrAcceptHint;

impl ConditionalEventHandler for TabCompleteOrAcceptHint {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.has_hint() {
            Some(Cmd::CompleteHint)
        } else {
            Some(Cmd::Complete)
        }
    }
}

/// Run the interactive REPL. Blocks the calling thread; async session work
/// is driven on `runtime`.
pub fn run(mut session: BrowserSession, runtime: Handle) -> anyhow::Result<()> {
    eprintln!();
    eprintln!(
        "  \x1b[1mpjax-shell v{}\x1b[0m \x1b[90m{}\x1b[0m",
        env!("CARGO_PKG_VERSION"),
        session.url()
    );
    eprintln!();
    eprintln!(
        "    Press \x1b[36m/\x1b[0m to browse commands, \x1b[90mTab\x1b[0m to complete, \x1b[90m/exit\x1b[0m to quit."
    );
    eprintln!();
    cmd_title(&session);
    print_events(&mut session);

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(20)
        .build();

    let mut rl: Editor<ShellHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(config)?;
    rl.set_helper(Some(ShellHelper));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    let hist_path = std::path::PathBuf::from(&home).join(".pjax_shell_history");
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    let prompt = " \x1b[36mpjax>\x1b[0m ";

    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let input = line.strip_prefix('/').unwrap_or(line);
                if input.is_empty() {
                    cmd_help();
                    continue;
                }

                let mut parts = input.splitn(2, ' ');
                let cmd = parts.next().unwrap_or("");
                let args = parts.next().unwrap_or("").trim();

                match cmd {
                    "exit" | "quit" => break,
                    "help" | "h" | "?" => cmd_help(),
                    "clear" | "cls" => eprint!("\x1b[2J\x1b[H"),
                    "links" | "ls" => cmd_links(&session),
                    "click" | "c" => cmd_click(args, &mut session, &runtime),
                    "back" | "b" => {
                        let result = runtime.block_on(session.back());
                        report_traversal(result, &session);
                    }
                    "forward" | "f" => {
                        let result = runtime.block_on(session.forward());
                        report_traversal(result, &session);
                    }
                    "show" => cmd_show(args, &session),
                    "title" => cmd_title(&session),
                    "history" => cmd_history(&session),
                    _ => {
                        eprintln!("  Unknown command '/{cmd}'. Type /help for commands.");
                    }
                }
                print_events(&mut session);
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("  \x1b[90m(Ctrl+C)\x1b[0m Type \x1b[1m/exit\x1b[0m to quit.");
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("  Error: {err}");
                break;
            }
        }
    }

    let _ = rl.save_history(&hist_path);
    Ok(())
}

fn cmd_help() {
    eprintln!();
    eprintln!("  Commands:");
    eprintln!();
    for (cmd, desc) in COMMANDS {
        eprintln!("    {cmd:<12} {desc}");
    }
    eprintln!();
}

fn cmd_links(session: &BrowserSession) {
    let links = session.links();
    if links.is_empty() {
        eprintln!("  No links on this page.");
        return;
    }
    eprintln!();
    for (i, link) in links.iter().enumerate() {
        let text = if link.text.is_empty() { "-" } else { link.text.as_str() };
        eprintln!(
            "    {:>3}  {:<24} {}  \x1b[90m→ {}\x1b[0m",
            i + 1,
            text,
            link.href,
            session.container_for(link)
        );
    }
    eprintln!();
}

fn cmd_click(args: &str, session: &mut BrowserSession, runtime: &Handle) {
    let Some(n) = args.parse::<usize>().ok().filter(|n| *n > 0) else {
        eprintln!("  Usage: /click <n>   (see /links)");
        return;
    };
    match runtime.block_on(session.click(n - 1)) {
        Ok(link) => {
            eprintln!("  Clicked {}", link.href);
            cmd_title(session);
        }
        Err(e) => eprintln!("  Click failed: {e:#}"),
    }
}

fn report_traversal(result: anyhow::Result<Traversal>, session: &BrowserSession) {
    match result {
        Ok(Traversal::Ignored) => {
            eprintln!("  \x1b[90mLoad-time popstate ignored; content unchanged.\x1b[0m");
            cmd_title(session);
        }
        Ok(_) => cmd_title(session),
        Err(e) => eprintln!("  {e:#}"),
    }
}

fn cmd_show(args: &str, session: &BrowserSession) {
    let selector = (!args.is_empty()).then_some(args);
    match session.show(selector) {
        Some(html) => {
            eprintln!();
            for line in html.trim().lines() {
                eprintln!("    {line}");
            }
            eprintln!();
        }
        None => eprintln!("  Nothing matches {}", selector.unwrap_or("the default container")),
    }
}

fn cmd_title(session: &BrowserSession) {
    eprintln!("  \x1b[1m{}\x1b[0m  {}", session.title(), session.url());
}

fn cmd_history(session: &BrowserSession) {
    let (entries, current) = session.history();
    eprintln!();
    for (i, entry) in entries.iter().enumerate() {
        let marker = if i == current { ">" } else { " " };
        let title = if entry.title.is_empty() { "-" } else { entry.title.as_str() };
        eprintln!("  {marker} {:>3}  {:<24} {}", i + 1, title, entry.url);
    }
    eprintln!();
}

fn print_events(session: &mut BrowserSession) {
    for event in session.drain_events() {
        let line = match event {
            PjaxEvent::Started { url, container, .. } => format!("fetch {url} into {container}"),
            PjaxEvent::Ended { outcome: NavigationOutcome::Swapped, .. } => "swapped".to_string(),
            PjaxEvent::Ended { .. } => continue,
            PjaxEvent::FullNavigation { url, reason } => {
                format!("full load of {url} ({})", reason_label(reason))
            }
            PjaxEvent::Replayed { url, container } => format!("replay {url} into {container}"),
        };
        eprintln!("  \x1b[90m· {line}\x1b[0m");
    }
}

fn reason_label(reason: pjax::FallbackReason) -> String {
    serde_json::to_value(reason)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{reason:?}"))
}
