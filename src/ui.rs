// UI layer: command parsing, dispatch onto the API client and navigation
// state, and the interactive shell loop. Output goes to the terminal with
// crossterm colors; diagnostics go through tracing.

use crate::api::LanzouClient;
use crate::error::{LanzouError, Result};
use crate::models::{FileEntry, FolderEntry};
use crate::nav::Navigator;
use crate::transport::{HttpTransport, Transport};
use crate::upload::{self, UploadOptions, FAILURE_CAUSES};
use crossterm::style::Stylize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use std::time::Duration;

/// Name of the notice file the service injects into listings.
const NOTICE_FILE_NAME: &str = "请忽使用第三方工具";

const BANNER: &str = r"
██╗      █████╗ ███╗   ██╗███████╗ ██████╗ ██╗   ██╗
██║     ██╔══██╗████╗  ██║╚══███╔╝██╔═══██╗██║   ██║
██║     ███████║██╔██╗ ██║  ███╔╝ ██║   ██║██║   ██║
██║     ██╔══██║██║╚██╗██║ ███╔╝  ██║   ██║██║   ██║
███████╗██║  ██║██║ ╚████║███████╗╚██████╔╝╚██████╔╝
╚══════╝╚═╝  ╚═╝╚═╝  ╚═══╝╚══════╝ ╚═════╝  ╚═════╝ ";

const HELP: [(&str, &str); 11] = [
    ("pwd", "show the current folder"),
    ("ls", "list folder contents"),
    ("cd <name>", "enter a folder"),
    ("cd ..", "go back to the parent folder"),
    ("cd /", "go back to the root folder"),
    ("mkdir <name>", "create a folder"),
    ("rmdir <name>", "delete a folder"),
    ("upload <path>", "upload a local file"),
    ("rm <name>", "delete a file"),
    ("help", "show this help"),
    ("exit", "quit"),
];

/// One user request, from either the command line or the shell.
///
/// Positional arguments are optional so a missing one can be reported as a
/// usage error instead of aborting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Pwd,
    Ls,
    Cd(Option<String>),
    Mkdir {
        name: Option<String>,
        description: String,
    },
    Rmdir(Option<String>),
    Upload(Option<PathBuf>),
    Rm(Option<String>),
    Help,
    Exit,
    Empty,
    Unknown(String),
}

impl Command {
    /// Parse a shell line. The command word is case-insensitive.
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace();
        let Some(word) = parts.next() else {
            return Command::Empty;
        };
        let arg = parts.next().map(str::to_string);
        match word.to_lowercase().as_str() {
            "pwd" => Command::Pwd,
            "ls" => Command::Ls,
            "cd" => Command::Cd(arg),
            "mkdir" => Command::Mkdir {
                name: arg,
                description: String::new(),
            },
            "rmdir" => Command::Rmdir(arg),
            "upload" => Command::Upload(arg.map(PathBuf::from)),
            "rm" => Command::Rm(arg),
            "help" => Command::Help,
            "exit" => Command::Exit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// Whether the shell should keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// `13812345678` → `138****5678`; anything else is returned unchanged.
pub fn mask_username(username: &str) -> String {
    if username.len() == 11 && username.chars().all(|c| c.is_ascii_digit()) {
        format!("{}****{}", &username[..3], &username[7..])
    } else {
        username.to_string()
    }
}

fn print_ok(msg: impl std::fmt::Display) {
    println!("{} {}", "✓".green(), msg);
}

fn print_err(msg: impl std::fmt::Display) {
    println!("{}", format!("✗ {}", msg).red());
}

fn print_help() {
    println!("\n{}", "=== Commands ===".blue());
    for (usage, text) in HELP {
        println!("{} {}", format!("{:<16}", usage).cyan(), text);
    }
}

/// The explicit session context: API client, navigation state and the
/// upload policy, owned by the single control flow.
pub struct App<T: Transport = HttpTransport> {
    client: LanzouClient<T>,
    nav: Navigator,
    upload: UploadOptions,
    sleep: fn(Duration),
}

impl<T: Transport> App<T> {
    pub fn new(client: LanzouClient<T>) -> Self {
        Self {
            client,
            nav: Navigator::new(),
            upload: UploadOptions::default(),
            sleep: std::thread::sleep,
        }
    }

    pub fn with_upload_options(mut self, options: UploadOptions, sleep: fn(Duration)) -> Self {
        self.upload = options;
        self.sleep = sleep;
        self
    }

    pub fn client(&self) -> &LanzouClient<T> {
        &self.client
    }

    pub fn nav(&self) -> &Navigator {
        &self.nav
    }

    /// Log in (saved session first). Errors are returned untouched so the
    /// entry point can terminate on a fatal one.
    pub fn login(&mut self, username: &str, password: &str) -> Result<()> {
        self.client.login(username, password)?;
        print_ok("logged in");
        if let Some(name) = self.client.session().username() {
            print_ok(format!("current user: {}", mask_username(name)));
        }
        Ok(())
    }

    /// Run one command from the command line, printing any error.
    pub fn run_once(&mut self, command: Command) {
        if let Err(e) = self.execute(command) {
            print_err(e);
        }
    }

    /// Read-eval loop until `exit` or end of input. Ctrl-C re-prompts.
    pub fn run_shell(&mut self, fallback_user: &str) -> anyhow::Result<()> {
        println!("{}", BANNER.blue());
        println!("\n{}", "=== Lanzou drive - interactive mode ===".blue());
        println!("{}", "type `help` for commands, `exit` to quit".cyan());

        let user = mask_username(self.client.session().username().unwrap_or(fallback_user));
        let mut rl = DefaultEditor::new()?;
        loop {
            let prompt = format!(
                "\n{}{}{}$ ",
                format!("{}@lanzou", user).green().bold(),
                ":".bold(),
                self.nav.path().blue().bold()
            );
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        let _ = rl.add_history_entry(line);
                    }
                    match self.execute(Command::parse(line)) {
                        Ok(Flow::Exit) => break,
                        Ok(Flow::Continue) => {}
                        Err(e) => print_err(e),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "type `exit` to quit".cyan());
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            }
        }
        println!("{}", "bye!".cyan());
        Ok(())
    }

    /// Dispatch one command. Precondition failures (missing argument, name
    /// not found, not logged in) come back as errors for the caller to print.
    pub fn execute(&mut self, command: Command) -> Result<Flow> {
        match command {
            Command::Empty => {}
            Command::Exit => return Ok(Flow::Exit),
            Command::Help => print_help(),
            Command::Pwd => self.pwd(),
            Command::Ls => self.ls()?,
            Command::Cd(name) => {
                let name = name.ok_or(LanzouError::MissingArgument("cd <name>"))?;
                self.client.ensure_logged_in()?;
                self.nav.cd(&self.client, &name)?;
                print_ok(format!("now in {}", self.nav.path()));
                print_ok(format!("folder id: {}", self.nav.current_id()));
            }
            Command::Mkdir { name, description } => {
                let name = name.ok_or(LanzouError::MissingArgument("mkdir <name>"))?;
                match self
                    .client
                    .create_folder(&name, self.nav.current_id(), &description)?
                {
                    Some(folder) => print_ok(format!("created {}, id {}", folder.name, folder.folder_id)),
                    None => print_err(format!("could not create folder {}", name)),
                }
            }
            Command::Rmdir(name) => {
                let name = name.ok_or(LanzouError::MissingArgument("rmdir <name>"))?;
                let folder = self.find_folder(&name)?;
                if self.client.delete_folder(&folder.folder_id)? {
                    print_ok(format!("deleted folder {}", name));
                } else {
                    print_err(format!("could not delete folder {}", name));
                }
            }
            Command::Rm(name) => {
                let name = name.ok_or(LanzouError::MissingArgument("rm <name>"))?;
                let file = self.find_file(&name)?;
                if self.client.delete_file(&file.id)? {
                    print_ok(format!("deleted {}", name));
                } else {
                    print_err(format!("could not delete {}", name));
                }
            }
            Command::Upload(path) => {
                let path = path.ok_or(LanzouError::MissingArgument("upload <path>"))?;
                self.upload(path)?;
            }
            Command::Unknown(word) => {
                print_err(format!("unknown command: {}", word));
                println!("{}", "type `help` for available commands".cyan());
            }
        }
        Ok(Flow::Continue)
    }

    fn pwd(&self) {
        println!("\ncurrent folder: {}", self.nav.path());
        println!("folder id: {}", self.nav.current_id());
    }

    fn ls(&self) -> Result<()> {
        let folder_id = self.nav.current_id();
        println!("\n{}", format!("=== {} ===", self.nav.path()).blue());

        let folders = self.client.list_folders(folder_id)?;
        if !folders.is_empty() {
            println!("\n[folders]");
            for folder in &folders {
                println!("├─ {}", folder);
            }
        }

        let files: Vec<FileEntry> = self
            .client
            .list_files(folder_id)?
            .into_iter()
            .filter(|f| f.name != NOTICE_FILE_NAME)
            .collect();
        if !files.is_empty() {
            println!("\n[files]");
            for file in &files {
                println!("├─ {}", file);
            }
        }

        if folders.is_empty() && files.is_empty() {
            println!("\n(empty)");
        }
        Ok(())
    }

    fn find_folder(&self, name: &str) -> Result<FolderEntry> {
        self.client
            .list_folders(self.nav.current_id())?
            .into_iter()
            .find(|f| f.name == name)
            .ok_or_else(|| LanzouError::FolderNotFound(name.to_string()))
    }

    fn find_file(&self, name: &str) -> Result<FileEntry> {
        self.client
            .list_files(self.nav.current_id())?
            .into_iter()
            .find(|f| f.name == name)
            .ok_or_else(|| LanzouError::FileNotFound(name.to_string()))
    }

    fn upload(&self, path: PathBuf) -> Result<()> {
        let size = upload::check_upload_size(&path)?;
        println!("\n[upload]");
        println!("file: {}", path.display());
        println!("size: {:.2} MB", size as f64 / 1024.0 / 1024.0);
        println!(
            "target: {}",
            if self.nav.is_root() {
                self.nav.path()
            } else {
                self.nav.current_id().to_string()
            }
        );

        match upload::upload_with_retry(
            &self.client,
            &path,
            self.nav.current_id(),
            self.upload,
            self.sleep,
        ) {
            Ok(link) => {
                println!("\n{}", "=== upload finished ===".blue());
                print_ok(format!("share link: {}", link).green());
                Ok(())
            }
            Err(e @ LanzouError::UploadFailed { .. }) => {
                println!("\n{}", "=== upload failed ===".red());
                println!("{}", "possible causes:".yellow());
                for (i, cause) in FAILURE_CAUSES.iter().enumerate() {
                    println!("{}. {}", i + 1, cause);
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::{client_in, logged_in};
    use crate::retry::RetryPolicy;
    use crate::transport::fake::FakeTransport;
    use serde_json::json;

    fn app(client: LanzouClient<FakeTransport>) -> App<FakeTransport> {
        App::new(client).with_upload_options(
            UploadOptions {
                retry: RetryPolicy::default(),
                show_progress: false,
            },
            |_| {},
        )
    }

    #[test]
    fn parses_shell_lines() {
        assert_eq!(Command::parse("  "), Command::Empty);
        assert_eq!(Command::parse("LS"), Command::Ls);
        assert_eq!(Command::parse("cd .."), Command::Cd(Some("..".into())));
        assert_eq!(Command::parse("cd"), Command::Cd(None));
        assert_eq!(
            Command::parse("upload ./a b.txt"),
            Command::Upload(Some(PathBuf::from("./a")))
        );
        assert_eq!(
            Command::parse("mkdir photos"),
            Command::Mkdir {
                name: Some("photos".into()),
                description: String::new()
            }
        );
        assert_eq!(Command::parse("format c:"), Command::Unknown("format".into()));
    }

    #[test]
    fn masks_phone_numbers_only() {
        assert_eq!(mask_username("13812345678"), "138****5678");
        assert_eq!(mask_username("alice"), "alice");
        assert_eq!(mask_username("1381234567"), "1381234567");
    }

    #[test]
    fn missing_argument_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(logged_in(&dir));
        for command in [
            Command::Cd(None),
            Command::Rmdir(None),
            Command::Rm(None),
            Command::Upload(None),
        ] {
            let err = app.execute(command).unwrap_err();
            assert!(matches!(err, LanzouError::MissingArgument(_)));
            assert!(!err.is_fatal());
        }
        assert_eq!(app.client().transport().requests().len(), 1);
    }

    #[test]
    fn cd_requires_login() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(client_in(&dir));
        let err = app.execute(Command::Cd(Some("docs".into()))).unwrap_err();
        assert!(matches!(err, LanzouError::NotLoggedIn));
    }

    #[test]
    fn cd_and_back_updates_prompt_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(logged_in(&dir));
        app.client()
            .transport()
            .push_json(json!({"zt": 2, "text": [{"name": "docs", "fol_id": "10"}]}));

        app.execute(Command::Cd(Some("docs".into()))).unwrap();
        assert_eq!(app.nav().path(), "/root/docs");

        app.execute(Command::Cd(Some("..".into()))).unwrap();
        assert_eq!(app.nav().path(), "/root");
        assert!(matches!(
            app.execute(Command::Cd(Some("..".into()))),
            Err(LanzouError::AlreadyAtRoot)
        ));
    }

    #[test]
    fn cd_slash_jumps_to_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(logged_in(&dir));
        app.client()
            .transport()
            .push_json(json!({"zt": 2, "text": [{"name": "docs", "fol_id": "10"}]}))
            .push_json(json!({"zt": 2, "text": [{"name": "2024", "fol_id": "11"}]}));
        app.execute(Command::Cd(Some("docs".into()))).unwrap();
        app.execute(Command::Cd(Some("2024".into()))).unwrap();
        assert_eq!(app.nav().path(), "/root/docs/2024");
        let sent = app.client().transport().requests().len();

        app.execute(Command::Cd(Some("/".into()))).unwrap();

        assert_eq!(app.nav().path(), "/root");
        assert_eq!(app.nav().current_id(), "-1");
        assert_eq!(app.client().transport().requests().len(), sent);
    }

    #[test]
    fn rmdir_unknown_name_sends_no_delete() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(logged_in(&dir));
        app.client()
            .transport()
            .push_json(json!({"zt": 2, "text": [{"name": "docs", "fol_id": "10"}]}));

        let err = app.execute(Command::Rmdir(Some("music".into()))).unwrap_err();

        assert!(matches!(err, LanzouError::FolderNotFound(_)));
        let requests = app.client().transport().requests();
        assert!(requests.iter().all(|r| r.field("task") != Some("3")));
    }

    #[test]
    fn rm_resolves_name_to_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(logged_in(&dir));
        app.client()
            .transport()
            .push_json(json!({"zt": 1, "text": [{"id": "71", "name": "a.txt"}, {"id": "72", "name": "b.txt"}]}))
            .push_json(json!({"zt": 1, "text": []}))
            .push_json(json!({"zt": 1, "info": "已删除"}));

        app.execute(Command::Rm(Some("b.txt".into()))).unwrap();

        let last = app.client().transport().requests().pop().unwrap();
        assert_eq!(last.field("task"), Some("6"));
        assert_eq!(last.field("file_id"), Some("72"));
    }

    #[test]
    fn mkdir_targets_current_folder() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(logged_in(&dir));
        app.client()
            .transport()
            .push_json(json!({"zt": 2, "text": [{"name": "docs", "fol_id": "10"}]}))
            .push_json(json!({"zt": 1, "text": "99"}));

        app.execute(Command::Cd(Some("docs".into()))).unwrap();
        app.execute(Command::Mkdir {
            name: Some("drafts".into()),
            description: "wip".into(),
        })
        .unwrap();

        let last = app.client().transport().requests().pop().unwrap();
        assert_eq!(last.field("parent_id"), Some("10"));
        assert_eq!(last.field("folder_description"), Some("wip"));
    }

    #[test]
    fn failed_upload_reports_after_retries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.txt");
        std::fs::write(&path, b"hello").unwrap();
        let mut app = app(logged_in(&dir));
        for _ in 0..3 {
            app.client().transport().push_status(500);
        }

        let err = app.execute(Command::Upload(Some(path))).unwrap_err();

        assert!(matches!(err, LanzouError::UploadFailed { attempts: 3, .. }));
    }

    #[test]
    fn exit_stops_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(client_in(&dir));
        assert_eq!(app.execute(Command::Exit).unwrap(), Flow::Exit);
        assert_eq!(app.execute(Command::Empty).unwrap(), Flow::Continue);
    }
}
