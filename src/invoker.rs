//! Running XJC, either as a forked JVM or through an embedded tool.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, PipeReader, Write};
use std::panic::{self, AssertUnwindSafe, PanicHookInfo};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::process::Command as ProcessCommand;
use tracing::{debug, info};

use crate::error::{ExitStatusKind, Result, XjcError};
use crate::router::{LogSink, OutputRouter};

/// JVM system properties set on every forked launch
pub const DEFAULT_SYSTEM_PROPERTIES: [(&str, &str); 2] = [
    ("com.sun.tools.xjc.XJCFacade.nohack", "true"),
    ("com.sun.tools.xjc.Options.findServices", "true"),
];

/// Set when a catalog is in use so unresolvable catalog entries are skipped
pub const CATALOG_PROPERTY: (&str, &str) = ("xml.catalog.ignoreMissing", "true");

/// Result of a finished tool run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolOutcome {
    pub exit_code: i32,
    pub output_lines: usize,
}

/// How the JVM is launched in subprocess mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Launcher {
    pub program: String,
    pub jvm_options: Vec<String>,
    pub system_properties: BTreeMap<String, String>,
}

impl Default for Launcher {
    fn default() -> Self {
        Self {
            program: "java".to_string(),
            jvm_options: Vec::new(),
            system_properties: DEFAULT_SYSTEM_PROPERTIES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl Launcher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Tokens following the program name: JVM options, `-D` properties,
    /// then the translated arguments.
    pub fn launch_arguments(&self, args: &[String], uses_catalog: bool) -> Vec<String> {
        let mut tokens = self.jvm_options.clone();
        let mut properties = self.system_properties.clone();
        if uses_catalog {
            properties
                .entry(CATALOG_PROPERTY.0.to_string())
                .or_insert_with(|| CATALOG_PROPERTY.1.to_string());
        }
        tokens.extend(properties.iter().map(|(k, v)| format!("-D{}={}", k, v)));
        tokens.extend(args.iter().cloned());
        tokens
    }

    async fn run(
        &self,
        args: &[String],
        uses_catalog: bool,
        sink: Arc<dyn LogSink>,
    ) -> Result<ToolOutcome> {
        let launch_args = self.launch_arguments(args, uses_catalog);
        let command_line = command_line(&self.program, &launch_args);
        debug!(command_line = %command_line, "spawning xjc");

        // stdout and stderr share one pipe so lines keep the order the tool wrote them in
        let (reader, writer) = io::pipe()?;
        let error_writer = writer.try_clone()?;
        let mut process = ProcessCommand::new(&self.program);
        process
            .args(&launch_args)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(error_writer)
            .kill_on_drop(true);
        let spawned = process.spawn();
        // the builder holds the write ends; the reader only sees EOF once they are closed
        drop(process);
        let mut child = spawned.map_err(|source| XjcError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let pumped = tokio::task::spawn_blocking(move || pump(reader, sink));
        let (status, output_lines) = tokio::join!(child.wait(), pumped);
        let status = status?;
        let output_lines = output_lines.map_err(|e| XjcError::Concurrency {
            details: format!("xjc output task failed: {}", e),
        })??;

        match exit_code(status) {
            Some(0) => Ok(ToolOutcome {
                exit_code: 0,
                output_lines,
            }),
            Some(code) => Err(XjcError::Invocation {
                status: ExitStatusKind::Code(code),
                command_line,
            }),
            None => Err(XjcError::Invocation {
                status: ExitStatusKind::Signal,
                command_line,
            }),
        }
    }
}

/// A compiler linked into the current process.
///
/// Implementations write their console output to `out` and return the exit
/// code they would have passed to the process exit call.
pub trait EmbeddedTool: Send + Sync {
    fn run(&self, args: &[String], out: &mut dyn Write) -> i32;
}

impl<F> EmbeddedTool for F
where
    F: Fn(&[String], &mut dyn Write) -> i32 + Send + Sync,
{
    fn run(&self, args: &[String], out: &mut dyn Write) -> i32 {
        self(args, out)
    }
}

/// Invocation strategy, chosen once when the compiler is built
#[derive(Clone)]
pub enum Invocation {
    Subprocess(Launcher),
    InProcess(Arc<dyn EmbeddedTool>),
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocation::Subprocess(launcher) => {
                f.debug_tuple("Subprocess").field(launcher).finish()
            }
            Invocation::InProcess(_) => f.write_str("InProcess"),
        }
    }
}

impl Default for Invocation {
    fn default() -> Self {
        Invocation::Subprocess(Launcher::default())
    }
}

impl Invocation {
    pub fn in_process(tool: impl EmbeddedTool + 'static) -> Self {
        Invocation::InProcess(Arc::new(tool))
    }

    pub fn is_subprocess(&self) -> bool {
        matches!(self, Invocation::Subprocess(_))
    }

    /// Run the tool with `args`, routing its output into `sink`.
    ///
    /// A non-zero exit is an [`XjcError::Invocation`] carrying the full
    /// command line.
    pub async fn run(
        &self,
        args: Vec<String>,
        uses_catalog: bool,
        sink: Arc<dyn LogSink>,
    ) -> Result<ToolOutcome> {
        match self {
            Invocation::Subprocess(launcher) => launcher.run(&args, uses_catalog, sink).await,
            Invocation::InProcess(tool) => run_embedded(Arc::clone(tool), args, sink).await,
        }
    }
}

async fn run_embedded(
    tool: Arc<dyn EmbeddedTool>,
    args: Vec<String>,
    sink: Arc<dyn LogSink>,
) -> Result<ToolOutcome> {
    let command_line = args.join(" ");
    debug!(command_line = %command_line, "running embedded xjc");

    let joined = tokio::task::spawn_blocking(move || {
        let _trap = ExitTrap::engage();
        let mut router = OutputRouter::new(sink);
        let result = panic::catch_unwind(AssertUnwindSafe(|| tool.run(&args, &mut router)));
        (result, router.finish())
    })
    .await
    .map_err(|e| XjcError::Concurrency {
        details: format!("embedded xjc task failed: {}", e),
    })?;

    match joined {
        (Ok(0), output_lines) => Ok(ToolOutcome {
            exit_code: 0,
            output_lines,
        }),
        (Ok(code), _) => Err(XjcError::Invocation {
            status: ExitStatusKind::Code(code),
            command_line,
        }),
        (Err(payload), _) => Err(XjcError::Invocation {
            status: ExitStatusKind::Panic(panic_message(payload.as_ref())),
            command_line,
        }),
    }
}

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

static EXIT_TRAP_LOCK: Mutex<()> = Mutex::new(());

/// Process-wide guard around one embedded run.
///
/// Holding it serializes embedded runs and replaces the panic hook, so a
/// tool that aborts by panicking does not print to the console. The
/// previous hook is reinstated when the guard drops.
pub struct ExitTrap {
    previous_hook: Option<PanicHook>,
    _lock: MutexGuard<'static, ()>,
}

impl ExitTrap {
    pub fn engage() -> Self {
        let lock = EXIT_TRAP_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous_hook = panic::take_hook();
        panic::set_hook(Box::new(|info| {
            debug!(target: "xjc", "embedded tool aborted: {}", info);
        }));
        Self {
            previous_hook: Some(previous_hook),
            _lock: lock,
        }
    }
}

impl Drop for ExitTrap {
    fn drop(&mut self) {
        if let Some(hook) = self.previous_hook.take() {
            panic::set_hook(hook);
        }
    }
}

fn pump(mut reader: PipeReader, sink: Arc<dyn LogSink>) -> io::Result<usize> {
    let mut router = OutputRouter::new(sink);
    io::copy(&mut reader, &mut router)?;
    Ok(router.finish())
}

fn exit_code(status: ExitStatus) -> Option<i32> {
    let code = status.code();
    if code.is_none() {
        info!("xjc terminated by a signal");
    }
    code
}

fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
