//! CLI commands implementation
//!
//! Each command is a straight-line script over the stores in `dincon_core`.
//! Nothing is shared between commands except the files on disk.

use anyhow::{Context as _, Result};
use dincon_core::plan::{create_plan, execute_prompt, plan_prompt};
use dincon_core::project::PLAN_FILE;
use dincon_core::{
    ChatCompletion, ConfigStore, DinconError, Git, Project, ProjectManifest, Settings, UserConfig,
};
use tracing::{debug, warn};

use crate::console::{resolve_field, Console};

/// Where a command reads and writes its files
#[derive(Debug, Clone)]
pub struct Context {
    pub store: ConfigStore,
    pub project: Project,
    pub git: Git,
}

impl Context {
    /// Read `settings.toml` on demand so only commands that need it can fail on it
    pub fn settings(&self) -> Result<Settings> {
        Settings::load(self.store.dir())
    }
}

/// Record the user's identity
pub fn setup(
    ctx: &Context,
    console: &mut dyn Console,
    email: Option<String>,
    name: Option<String>,
) -> Result<()> {
    let email = resolve_field(email, "Email", console)?;
    let name = resolve_field(name, "Name", console)?;

    let config = UserConfig { email, name };
    ctx.store.save(&config)?;

    console.say(&format!("Setup complete for {} ({})", config.name, config.email))
}

/// Open the login page and store the pasted token
pub fn login(
    ctx: &Context,
    console: &mut dyn Console,
    token: Option<String>,
    open_browser: bool,
) -> Result<()> {
    let settings = ctx.settings()?;
    let url = settings.auth.login_url.as_str();

    if token.is_none() {
        if open_browser {
            if let Err(e) = open::that(url) {
                warn!(url, error = %e, "Failed to open browser");
                console.say(&format!("Could not open a browser. Visit {url} to get a token."))?;
            }
        } else {
            console.say(&format!("Visit {url} to get a token."))?;
        }
    }

    let token = resolve_field(token, "Enter the token from the web page", console)?;
    ctx.store.save_token(&token)?;

    console.say("Login successful")
}

pub fn logout(ctx: &Context, console: &mut dyn Console) -> Result<()> {
    if ctx.store.delete_token()? {
        console.say("Logged out successfully")
    } else {
        console.say("No active session found")
    }
}

/// Show the saved identity and session state
pub fn whoami(ctx: &Context, console: &mut dyn Console) -> Result<()> {
    match ctx.store.load()? {
        Some(config) => console.say(&format!("User: {} ({})", config.name, config.email))?,
        None => console.say("User: not set up (run 'dincon setup')")?,
    }

    let session = if ctx.store.load_token()?.is_some() {
        "active"
    } else {
        "none"
    };
    console.say(&format!("Session: {session}"))
}

/// Create the project manifest
pub fn init(
    ctx: &Context,
    console: &mut dyn Console,
    title: Option<String>,
    description: Option<String>,
) -> Result<()> {
    // Checked before any prompt
    if ctx.project.has_manifest() {
        return Err(DinconError::ManifestExists(
            dincon_core::project::MANIFEST_FILE.to_string(),
        )
        .into());
    }

    let title = resolve_field(title, "Enter project title", console)?;
    let description = resolve_field(description, "Enter project description", console)?;

    ctx.project
        .create_manifest(&ProjectManifest { title, description })?;

    console.say("Initialized .dincon repository")
}

/// Ask the model to break a task into steps and save the plan
pub fn plan(
    ctx: &Context,
    console: &mut dyn Console,
    chat: &dyn ChatCompletion,
    task: Vec<String>,
) -> Result<()> {
    let task = if task.is_empty() {
        console.input("Describe the task")?
    } else {
        task.join(" ")
    };

    let response = chat
        .complete(&plan_prompt(&task))
        .context("Failed to get a plan from the model")?;
    debug!(response = %response, "Model plan response");

    let plan = create_plan(&response)?;
    ctx.project.save_plan(&plan)?;

    console.say(&format!("Plan created and saved to {PLAN_FILE}"))?;
    for step in &plan.steps {
        console.say(&format!("{}. {}", step.step_number, step.summary))?;
    }
    Ok(())
}

/// Print the saved plan without contacting the model
pub fn show(ctx: &Context, console: &mut dyn Console) -> Result<()> {
    let plan = ctx.project.load_plan()?;

    if plan.is_empty() {
        return console.say("The plan has no steps.");
    }
    for step in &plan.steps {
        console.say(&format!(
            "{}. [{}] {}",
            step.step_number, step.step_type, step.summary
        ))?;
        for line in step.value.lines() {
            console.say(&format!("     {line}"))?;
        }
    }
    Ok(())
}

/// Forward one step to the model and print its suggestions.
///
/// `connect` runs only once the step is known to exist.
pub fn execute<C, F>(ctx: &Context, console: &mut dyn Console, step: i64, connect: F) -> Result<()>
where
    C: ChatCompletion,
    F: FnOnce(&Context) -> Result<C>,
{
    let plan = ctx.project.load_plan()?;
    let current = plan.get_step(step)?;
    let chat = connect(ctx)?;

    console.say(&format!("Executing step {step}: {}", current.summary))?;

    let response = chat
        .complete(&execute_prompt(current))
        .context("Failed to get suggestions from the model")?;

    console.say("AI suggestions:")?;
    console.say(&response)?;
    console.say("Please review and manually apply the suggested changes.")
}

/// Stage everything and commit it
pub fn commit(ctx: &Context, console: &mut dyn Console, message: Option<String>) -> Result<()> {
    if !ctx.git.has_repo() {
        return Err(DinconError::NotARepository("Please initialize Git first.").into());
    }

    let staged = ctx.git.stage_all()?;
    if !staged.status.success() {
        return Err(DinconError::GitFailed {
            action: "staging changes",
            stderr: String::from_utf8_lossy(&staged.stderr).trim().to_string(),
        }
        .into());
    }

    let message = resolve_field(message, "Enter commit message", console)?;
    let outcome = ctx.git.commit(&message)?;

    if !outcome.success {
        return Err(DinconError::GitFailed {
            action: "committing changes",
            stderr: outcome.message().to_string(),
        }
        .into());
    }

    console.say("Changes committed successfully.")
}

/// Discard uncommitted changes after confirmation
pub fn abort(ctx: &Context, console: &mut dyn Console, assume_yes: bool) -> Result<()> {
    if !ctx.git.has_repo() {
        return Err(DinconError::NotARepository("Cannot revert changes.").into());
    }

    if ctx.git.status_porcelain()?.trim().is_empty() {
        return console.say("No changes to revert.");
    }

    if !assume_yes
        && !console.confirm("There are uncommitted changes. Do you want to revert them?")?
    {
        return Err(DinconError::Aborted.into());
    }

    let reset = ctx.git.hard_reset()?;
    if !reset.status.success() {
        return Err(DinconError::GitFailed {
            action: "reverting changes",
            stderr: String::from_utf8_lossy(&reset.stderr).trim().to_string(),
        }
        .into());
    }

    console.say("Changes reverted successfully.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::Terminal;
    use std::cell::{Cell, RefCell};
    use std::io::Cursor;
    use std::process::Command;
    use tempfile::TempDir;

    const PLAN_RESPONSE: &str = r#"[
        {"stepNumber": 1, "summary": "Create the crate", "type": "command", "value": "cargo new demo"},
        {"stepNumber": 2, "summary": "Add a greeting", "type": "code", "value": "println!(\"hi\");"}
    ]"#;

    struct Fixture {
        _home: TempDir,
        project_dir: TempDir,
        ctx: Context,
    }

    fn fixture() -> Fixture {
        let home = TempDir::new().unwrap();
        let project_dir = TempDir::new().unwrap();
        let ctx = Context {
            store: ConfigStore::new(home.path().join(".dincon")),
            project: Project::new(project_dir.path()),
            git: Git::new(project_dir.path()),
        };
        Fixture {
            _home: home,
            project_dir,
            ctx,
        }
    }

    type TestConsole = Terminal<Cursor<Vec<u8>>, Vec<u8>>;

    fn console(input: &str) -> TestConsole {
        Terminal::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn output(console: TestConsole) -> String {
        String::from_utf8(console.into_writer()).unwrap()
    }

    /// Canned model that records the prompts it was asked
    struct FakeChat {
        reply: String,
        prompts: RefCell<Vec<String>>,
    }

    impl FakeChat {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl ChatCompletion for FakeChat {
        fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.borrow_mut().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    fn init_repo(dir: &std::path::Path) -> bool {
        if which::which("git").is_err() {
            return false;
        }
        let setup: [&[&str]; 4] = [
            &["init"],
            &["config", "user.email", "test@test.com"],
            &["config", "user.name", "Test User"],
            &["config", "commit.gpgsign", "false"],
        ];
        for args in setup {
            Command::new("git")
                .args(args)
                .current_dir(dir)
                .output()
                .unwrap();
        }
        true
    }

    #[test]
    fn test_setup_prompts_for_missing_fields() {
        let f = fixture();
        let mut c = console("Ada Lovelace\n");

        setup(&f.ctx, &mut c, Some("ada@example.com".to_string()), None).unwrap();

        assert_eq!(
            f.ctx.store.load().unwrap(),
            Some(UserConfig {
                email: "ada@example.com".to_string(),
                name: "Ada Lovelace".to_string(),
            })
        );
        assert!(output(c).contains("Setup complete for Ada Lovelace (ada@example.com)"));
    }

    #[test]
    fn test_login_then_logout() {
        let f = fixture();

        let mut c = console("tok-123\n");
        login(&f.ctx, &mut c, None, false).unwrap();
        let out = output(c);
        assert!(out.contains("https://example.com/login"));
        assert!(out.contains("Login successful"));
        assert_eq!(f.ctx.store.load_token().unwrap().as_deref(), Some("tok-123"));

        let mut c = console("");
        logout(&f.ctx, &mut c).unwrap();
        assert!(output(c).contains("Logged out successfully"));
        assert!(!f.ctx.store.token_path().exists());
    }

    #[test]
    fn test_logout_without_session() {
        let f = fixture();
        let mut c = console("");

        logout(&f.ctx, &mut c).unwrap();
        assert!(output(c).contains("No active session found"));
    }

    #[test]
    fn test_whoami() {
        let f = fixture();
        let mut c = console("");
        whoami(&f.ctx, &mut c).unwrap();
        let out = output(c);
        assert!(out.contains("not set up"));
        assert!(out.contains("Session: none"));

        f.ctx
            .store
            .save(&UserConfig {
                email: "e@x.io".to_string(),
                name: "E".to_string(),
            })
            .unwrap();
        f.ctx.store.save_token("t").unwrap();

        let mut c = console("");
        whoami(&f.ctx, &mut c).unwrap();
        let out = output(c);
        assert!(out.contains("User: E (e@x.io)"));
        assert!(out.contains("Session: active"));
    }

    #[test]
    fn test_init_writes_manifest() {
        let f = fixture();
        let mut c = console("demo\nA demo project\n");

        init(&f.ctx, &mut c, None, None).unwrap();

        assert_eq!(
            f.ctx.project.load_manifest().unwrap(),
            Some(ProjectManifest {
                title: "demo".to_string(),
                description: "A demo project".to_string(),
            })
        );
        assert!(output(c).contains("Initialized .dincon repository"));
    }

    #[test]
    fn test_init_refuses_existing_manifest_without_prompting() {
        let f = fixture();
        let path = f.ctx.project.manifest_path();
        std::fs::write(&path, "{\"title\":\"x\",\"description\":\"y\"}").unwrap();
        let before = std::fs::read(&path).unwrap();

        let mut c = console("");
        let err = init(&f.ctx, &mut c, None, None).unwrap_err();

        assert!(err.to_string().contains("already exists"));
        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert!(output(c).is_empty());
    }

    #[test]
    fn test_plan_saves_and_lists_steps() {
        let f = fixture();
        let chat = FakeChat::new(PLAN_RESPONSE);
        let mut c = console("");

        plan(
            &f.ctx,
            &mut c,
            &chat,
            vec!["build".to_string(), "a".to_string(), "demo".to_string()],
        )
        .unwrap();

        assert!(chat.prompts.borrow()[0].contains("\"build a demo\""));

        let saved = f.ctx.project.load_plan().unwrap();
        assert_eq!(saved, create_plan(PLAN_RESPONSE).unwrap());

        let out = output(c);
        let first = out.find("1. Create the crate").unwrap();
        let second = out.find("2. Add a greeting").unwrap();
        assert!(out.contains("Plan created and saved to .dincon_plan.json"));
        assert!(first < second);
    }

    #[test]
    fn test_plan_prompts_for_empty_task() {
        let f = fixture();
        let chat = FakeChat::new(PLAN_RESPONSE);
        let mut c = console("write docs\n");

        plan(&f.ctx, &mut c, &chat, Vec::new()).unwrap();
        assert!(chat.prompts.borrow()[0].contains("\"write docs\""));
    }

    #[test]
    fn test_plan_decode_error_saves_nothing() {
        let f = fixture();
        let chat = FakeChat::new("Step one: install things. Step two: profit.");
        let mut c = console("");

        let err = plan(&f.ctx, &mut c, &chat, vec!["task".to_string()]).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DinconError>(),
            Some(DinconError::PlanDecode(_))
        ));
        assert!(!f.ctx.project.plan_path().exists());
    }

    #[test]
    fn test_plan_decode_error_keeps_previous_plan() {
        let f = fixture();
        f.ctx
            .project
            .save_plan(&create_plan(PLAN_RESPONSE).unwrap())
            .unwrap();
        let before = std::fs::read(f.ctx.project.plan_path()).unwrap();

        let chat = FakeChat::new("{ not json");
        let mut c = console("");
        assert!(plan(&f.ctx, &mut c, &chat, vec!["task".to_string()]).is_err());

        assert_eq!(std::fs::read(f.ctx.project.plan_path()).unwrap(), before);
    }

    #[test]
    fn test_show_lists_plan() {
        let f = fixture();
        f.ctx
            .project
            .save_plan(&create_plan(PLAN_RESPONSE).unwrap())
            .unwrap();

        let mut c = console("");
        show(&f.ctx, &mut c).unwrap();
        let out = output(c);
        assert!(out.contains("1. [command] Create the crate"));
        assert!(out.contains("     cargo new demo"));
    }

    #[test]
    fn test_execute_forwards_step() {
        let f = fixture();
        f.ctx
            .project
            .save_plan(&create_plan(PLAN_RESPONSE).unwrap())
            .unwrap();
        let chat = FakeChat::new("edit src/main.rs");
        let mut c = console("");

        execute(&f.ctx, &mut c, 2, |_| Ok(&chat)).unwrap();

        assert!(chat.prompts.borrow()[0].contains("Add a greeting"));
        let out = output(c);
        assert!(out.contains("Executing step 2: Add a greeting"));
        assert!(out.contains("AI suggestions:\nedit src/main.rs\n"));
        assert!(out.contains("manually apply"));
    }

    #[test]
    fn test_execute_out_of_range_leaves_plan() {
        let f = fixture();
        f.ctx
            .project
            .save_plan(&create_plan(PLAN_RESPONSE).unwrap())
            .unwrap();
        let before = std::fs::read(f.ctx.project.plan_path()).unwrap();
        let connected = Cell::new(false);

        for step in [0, 3] {
            let mut c = console("");
            let err = execute(&f.ctx, &mut c, step, |_| {
                connected.set(true);
                Ok(FakeChat::new("unused"))
            })
            .unwrap_err();
            assert!(err.to_string().contains("between 1 and 2"));
        }

        assert!(!connected.get());
        assert_eq!(std::fs::read(f.ctx.project.plan_path()).unwrap(), before);
    }

    #[test]
    fn test_execute_without_plan() {
        let f = fixture();
        let connected = Cell::new(false);
        let mut c = console("");

        let err = execute(&f.ctx, &mut c, 1, |_| {
            connected.set(true);
            Ok(FakeChat::new("unused"))
        })
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DinconError>(),
            Some(DinconError::PlanNotFound)
        ));
        assert!(!connected.get());
    }

    #[test]
    fn test_execute_connect_failure_is_reported_after_plan_checks() {
        let f = fixture();
        f.ctx
            .project
            .save_plan(&create_plan(PLAN_RESPONSE).unwrap())
            .unwrap();
        let mut c = console("");

        let err = execute(&f.ctx, &mut c, 1, |_| -> Result<FakeChat> {
            anyhow::bail!("Missing API key")
        })
        .unwrap_err();

        assert_eq!(err.to_string(), "Missing API key");
        assert!(output(c).is_empty());
    }

    #[test]
    fn test_malformed_settings_only_break_commands_that_read_them() {
        let f = fixture();
        std::fs::create_dir_all(f.ctx.store.dir()).unwrap();
        std::fs::write(f.ctx.store.dir().join("settings.toml"), "[llm\nmodel = ").unwrap();

        let mut c = console("");
        assert!(login(&f.ctx, &mut c, Some("tok".to_string()), false).is_err());
        assert!(f.ctx.store.load_token().unwrap().is_none());

        f.ctx.store.save_token("tok").unwrap();
        let mut c = console("");
        logout(&f.ctx, &mut c).unwrap();
        assert!(output(c).contains("Logged out successfully"));

        let mut c = console("");
        setup(&f.ctx, &mut c, Some("a@b.c".to_string()), Some("A".to_string())).unwrap();
        whoami(&f.ctx, &mut console("")).unwrap();
    }

    #[test]
    fn test_commit_outside_repo_has_no_side_effects() {
        let f = fixture();
        let mut c = console("should not be read\n");

        let err = commit(&f.ctx, &mut c, None).unwrap_err();

        assert!(err.to_string().contains("not a Git repository"));
        assert!(output(c).is_empty());
        assert!(!f.project_dir.path().join(".git").exists());
    }

    #[test]
    fn test_commit_in_repo() {
        let f = fixture();
        if !init_repo(f.project_dir.path()) {
            return;
        }
        std::fs::write(f.project_dir.path().join("a.txt"), "one").unwrap();

        let mut c = console("add a.txt\n");
        commit(&f.ctx, &mut c, None).unwrap();

        assert!(output(c).contains("Changes committed successfully."));
        assert!(f.ctx.git.status_porcelain().unwrap().is_empty());
    }

    #[test]
    fn test_commit_failure_surfaces_git_error() {
        let f = fixture();
        if !init_repo(f.project_dir.path()) {
            return;
        }

        let mut c = console("");
        let err = commit(&f.ctx, &mut c, Some("nothing".to_string())).unwrap_err();
        assert!(err.to_string().starts_with("Error committing changes"));
    }

    #[test]
    fn test_abort_outside_repo() {
        let f = fixture();
        let mut c = console("");

        let err = abort(&f.ctx, &mut c, false).unwrap_err();
        assert!(err.to_string().contains("Cannot revert changes"));
    }

    #[test]
    fn test_abort_clean_tree_does_nothing() {
        let f = fixture();
        if !init_repo(f.project_dir.path()) {
            return;
        }

        let mut c = console("");
        abort(&f.ctx, &mut c, false).unwrap();
        assert!(output(c).contains("No changes to revert."));
    }

    #[test]
    fn test_abort_declined_keeps_changes() {
        let f = fixture();
        if !init_repo(f.project_dir.path()) {
            return;
        }
        let file = f.project_dir.path().join("a.txt");
        std::fs::write(&file, "base").unwrap();
        commit(&f.ctx, &mut console(""), Some("base".to_string())).unwrap();
        std::fs::write(&file, "changed").unwrap();

        let mut c = console("n\n");
        let err = abort(&f.ctx, &mut c, false).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DinconError>(),
            Some(DinconError::Aborted)
        ));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "changed");
    }

    #[test]
    fn test_abort_confirmed_reverts() {
        let f = fixture();
        if !init_repo(f.project_dir.path()) {
            return;
        }
        let file = f.project_dir.path().join("a.txt");
        std::fs::write(&file, "base").unwrap();
        commit(&f.ctx, &mut console(""), Some("base".to_string())).unwrap();
        std::fs::write(&file, "changed").unwrap();

        let mut c = console("y\n");
        abort(&f.ctx, &mut c, false).unwrap();

        assert!(output(c).contains("Changes reverted successfully."));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "base");
    }
}
