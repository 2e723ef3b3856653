// UI layer: the single-key action menu and the flows behind each action.
// Flows ask questions through a `Prompter` and hand file work to `archive`.

use crate::archive::{Archive, Category};
use crate::device::DeviceError;
use crate::prompt::{is_interrupted, Prompter};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tracing::info;

const MENU: &str = "choose action:\n\
    - [b]ackup project\n\
    - backup project + [a]lbum\n\
    - [r]estore project\n\
    - backup [s]napshots\n\
    - [e]rase tape";

/// Show the action menu once, run the chosen action and wait for a final
/// key press. Unknown keys fall through to the exit prompt.
pub fn main_menu(prompter: &mut dyn Prompter, device: &Path, archive: &Archive) -> Result<()> {
    match prompter.key(MENU)? {
        'b' => handle_backup(prompter, device, archive, false)?,
        'a' => handle_backup(prompter, device, archive, true)?,
        'r' => handle_restore(prompter, device, archive)?,
        's' => handle_snapshots(device),
        'e' => handle_erase_tape(prompter, device, archive)?,
        other => info!("no action bound to {other:?}"),
    }
    prompter.key("press any key to exit")?;
    Ok(())
}

/// Spinner shown while one category is copied or removed.
fn step_spinner(message: String) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(message);
    Ok(spinner)
}

/// Runs `work`, announcing every category it reports on a spinner. Each
/// finished step stays on screen.
fn with_steps<T>(
    verb: &str,
    work: impl FnOnce(&mut dyn FnMut(Category)) -> Result<T>,
) -> Result<T> {
    let mut current: Option<ProgressBar> = None;
    let mut style_error = None;
    let result = work(&mut |category| {
        if let Some(done) = current.take() {
            done.finish_with_message(format!("{} done", done.message()));
        }
        match step_spinner(format!("{verb} {}...", category.label())) {
            Ok(spinner) => current = Some(spinner),
            Err(e) => style_error = Some(e),
        }
    });
    if let Some(done) = current.take() {
        if result.is_ok() {
            done.finish_with_message(format!("{} done", done.message()));
        } else {
            done.abandon();
        }
    }
    if let Some(e) = style_error {
        return Err(e);
    }
    result
}

/// Ask for a project name until one is accepted. Existing projects are
/// only reused after an explicit `y`.
fn ask_backup_name(prompter: &mut dyn Prompter, archive: &Archive) -> Result<String> {
    loop {
        let name = prompter.line("save project as", archive)?;
        if name.is_empty() {
            continue;
        }
        if !archive.available(&name) {
            println!("invalid project name!");
            continue;
        }
        if !archive.project_dir(&name).is_dir() {
            return Ok(name);
        }
        let question = format!("project {name} exists. overwrite? (y/N)");
        if prompter.key(&question)? == 'y' {
            return Ok(name);
        }
    }
}

/// Back up tape and presets, plus the album when `album` is set.
pub fn handle_backup(
    prompter: &mut dyn Prompter,
    device: &Path,
    archive: &Archive,
    album: bool,
) -> Result<()> {
    let name = ask_backup_name(prompter, archive)?;
    with_steps("backing up", |on_step| {
        archive
            .backup(device, &name, album, on_step)
            .with_context(|| format!("backing up project {name}"))
    })?;
    println!("backup complete!");
    Ok(())
}

/// Ask for an existing project and a confirmation to overwrite the device.
fn ask_restore_name(prompter: &mut dyn Prompter, archive: &Archive) -> Result<String> {
    loop {
        let name = prompter.line("restore from project", archive)?;
        if name.is_empty() {
            continue;
        }
        if !archive.exists(&name) {
            println!("invalid project name!");
            continue;
        }
        let question = format!("device content will be replaced with project {name}. continue? (y/N)");
        if prompter.key(&question)? == 'y' {
            return Ok(name);
        }
    }
}

/// Replace device tape and presets with a stored project.
pub fn handle_restore(prompter: &mut dyn Prompter, device: &Path, archive: &Archive) -> Result<()> {
    let name = ask_restore_name(prompter, archive)?;
    with_steps("restoring", |on_step| {
        archive
            .restore(device, &name, on_step)
            .with_context(|| format!("restoring project {name}"))
    })?;
    println!("restore complete!");
    Ok(())
}

pub fn handle_snapshots(_device: &Path) {
    println!("not implemented");
}

/// Optionally back up, then wipe the tape after an explicit `y`.
pub fn handle_erase_tape(
    prompter: &mut dyn Prompter,
    device: &Path,
    archive: &Archive,
) -> Result<()> {
    if prompter.key("back up project before erasing tape? (Y/n)")? != 'n' {
        handle_backup(prompter, device, archive, false)?;
    }
    if prompter.key("tape will be erased. continue? (y/N)")? != 'y' {
        return Ok(());
    }
    println!("erasing...");
    Archive::erase_tape(device).context("erasing tape")?;
    println!("tape erased!");
    Ok(())
}

/// How a run ended, and the exit status it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Cancelled,
    NotConnected,
    Failed,
}

impl Outcome {
    pub fn of(result: &Result<()>) -> Self {
        match result {
            Ok(()) => Outcome::Done,
            Err(e) if is_interrupted(e) => Outcome::Cancelled,
            Err(e) if e.downcast_ref::<DeviceError>().is_some() => Outcome::NotConnected,
            Err(_) => Outcome::Failed,
        }
    }

    /// A user cancel is a clean exit.
    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::Done | Outcome::Cancelled => 0,
            Outcome::NotConnected | Outcome::Failed => 1,
        }
    }
}

/// Tell the user why the run failed and return the process exit status.
pub fn report(result: &Result<()>) -> u8 {
    let outcome = Outcome::of(result);
    if let Err(e) = result {
        match outcome {
            Outcome::NotConnected => println!("{e}"),
            Outcome::Failed => eprintln!("error: {e:#}"),
            Outcome::Done | Outcome::Cancelled => {}
        }
    }
    outcome.exit_code()
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::io;

    use anyhow::Context;

    use super::{
        handle_backup, handle_erase_tape, handle_restore, main_menu, with_steps, Outcome,
    };
    use crate::archive::Category;
    use crate::archive::test::device;
    use crate::archive::{Archive, ArchiveError};
    use crate::device::DeviceError;
    use crate::prompt::is_interrupted;
    use crate::prompt::test::{Answer, ScriptedPrompter};

    #[test]
    fn test_backup_reprompts_on_empty_and_declined_overwrite() {
        let dev = tempfile::tempdir().unwrap();
        let arc = tempfile::tempdir().unwrap();
        device(dev.path());
        let archive = Archive::new(arc.path());
        fs::create_dir(archive.project_dir("taken")).unwrap();

        let mut prompter = ScriptedPrompter::new(vec![
            Answer::Line(""),
            Answer::Line("taken"),
            Answer::Key('n'),
            Answer::Line("../escape"),
            Answer::Line("fresh"),
        ]);
        handle_backup(&mut prompter, dev.path(), &archive, false).unwrap();

        assert!(prompter.finished());
        assert!(archive.project_dir("fresh").join("tape/track_1.aif").is_file());
        assert!(!archive.project_dir("taken").join("tape").exists());
        assert!(!arc.path().parent().unwrap().join("escape").exists());
    }

    #[test]
    fn test_backup_overwrites_after_yes() {
        let dev = tempfile::tempdir().unwrap();
        let arc = tempfile::tempdir().unwrap();
        device(dev.path());
        let archive = Archive::new(arc.path());
        fs::create_dir(archive.project_dir("taken")).unwrap();

        let mut prompter = ScriptedPrompter::new(vec![Answer::Line("taken"), Answer::Key('y')]);
        handle_backup(&mut prompter, dev.path(), &archive, true).unwrap();

        assert!(prompter.finished());
        assert!(archive.project_dir("taken").join("album/side_a.aif").is_file());
    }

    #[test]
    fn test_restore_reprompts_until_confirmed() {
        let dev = tempfile::tempdir().unwrap();
        let arc = tempfile::tempdir().unwrap();
        device(dev.path());
        let archive = Archive::new(arc.path());
        let tape = archive.project_dir("song").join("tape");
        fs::create_dir_all(&tape).unwrap();
        fs::write(tape.join("take.aif"), b"take").unwrap();

        let mut prompter = ScriptedPrompter::new(vec![
            Answer::Line("missing"),
            Answer::Line("song"),
            Answer::Key('\0'),
            Answer::Line("song"),
            Answer::Key('y'),
        ]);
        handle_restore(&mut prompter, dev.path(), &archive).unwrap();

        assert!(prompter.finished());
        assert!(dev.path().join("tape/take.aif").is_file());
        assert!(!dev.path().join("tape/track_1.aif").exists());
    }

    #[test]
    fn test_erase_tape_declined_keeps_files() {
        let dev = tempfile::tempdir().unwrap();
        let arc = tempfile::tempdir().unwrap();
        device(dev.path());
        let archive = Archive::new(arc.path());

        let mut prompter = ScriptedPrompter::new(vec![Answer::Key('n'), Answer::Key('\0')]);
        handle_erase_tape(&mut prompter, dev.path(), &archive).unwrap();

        assert!(prompter.finished());
        assert!(dev.path().join("tape/track_1.aif").is_file());
        assert!(archive.project_names().is_empty());
    }

    #[test]
    fn test_erase_tape_with_backup() {
        let dev = tempfile::tempdir().unwrap();
        let arc = tempfile::tempdir().unwrap();
        device(dev.path());
        let archive = Archive::new(arc.path());

        let mut prompter = ScriptedPrompter::new(vec![
            Answer::Key('\0'),
            Answer::Line("before erase"),
            Answer::Key('y'),
        ]);
        handle_erase_tape(&mut prompter, dev.path(), &archive).unwrap();

        assert!(prompter.finished());
        assert!(archive.project_dir("before erase").join("tape/track_2.aif").is_file());
        assert!(!dev.path().join("tape/track_1.aif").exists());
        assert!(!dev.path().join("tape/track_2.aif").exists());
    }

    #[test]
    fn test_menu_snapshots_and_unknown_key() {
        let dev = tempfile::tempdir().unwrap();
        let arc = tempfile::tempdir().unwrap();
        let archive = Archive::new(arc.path());

        for choice in ['s', 'x'] {
            let mut prompter = ScriptedPrompter::new(vec![Answer::Key(choice), Answer::Key('q')]);
            main_menu(&mut prompter, dev.path(), &archive).unwrap();
            assert!(prompter.finished());
            assert_eq!("press any key to exit", prompter.asked[1]);
        }
    }

    #[test]
    fn test_menu_cancel_is_interrupt() {
        let dev = tempfile::tempdir().unwrap();
        let arc = tempfile::tempdir().unwrap();
        device(dev.path());
        let archive = Archive::new(arc.path());

        let mut prompter = ScriptedPrompter::new(vec![Answer::Key('b'), Answer::Cancel]);
        let err = main_menu(&mut prompter, dev.path(), &archive).unwrap_err();
        assert!(is_interrupted(&err));
        assert!(archive.project_names().is_empty());
    }

    #[test]
    fn test_backup_reprompts_when_name_is_a_file() {
        let dev = tempfile::tempdir().unwrap();
        let arc = tempfile::tempdir().unwrap();
        device(dev.path());
        let archive = Archive::new(arc.path());
        fs::write(archive.project_dir("notes"), b"not a project").unwrap();

        let mut prompter =
            ScriptedPrompter::new(vec![Answer::Line("notes"), Answer::Line("session")]);
        handle_backup(&mut prompter, dev.path(), &archive, false).unwrap();

        assert!(prompter.finished());
        assert!(archive.project_dir("notes").is_file());
        assert!(archive.project_dir("session").join("tape/track_1.aif").is_file());
    }

    #[test]
    fn test_outcome_exit_codes() {
        assert_eq!(Outcome::Done, Outcome::of(&Ok(())));
        assert_eq!(0, Outcome::Done.exit_code());

        let cancelled: anyhow::Result<()> =
            Err(io::Error::new(io::ErrorKind::Interrupted, "cancelled")).context("backing up");
        assert_eq!(Outcome::Cancelled, Outcome::of(&cancelled));
        assert_eq!(0, Outcome::Cancelled.exit_code());

        let missing: anyhow::Result<()> = Err(DeviceError::NotFound.into());
        assert_eq!(Outcome::NotConnected, Outcome::of(&missing));
        assert_eq!(1, Outcome::NotConnected.exit_code());

        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("notes");
        fs::write(&blocker, b"").unwrap();
        let archive = Archive::new(&blocker);
        let failed: anyhow::Result<()> = archive
            .backup(tmp.path(), "jam", false, |_| {})
            .map(|_| ())
            .context("backing up project jam");
        assert!(matches!(
            failed.as_ref().unwrap_err().downcast_ref::<ArchiveError>(),
            Some(ArchiveError::Io { .. })
        ));
        assert_eq!(Outcome::Failed, Outcome::of(&failed));
        assert_eq!(1, Outcome::Failed.exit_code());
    }

    #[test]
    fn test_with_steps_reports_each_category_once() {
        let mut seen = Vec::new();
        let count = with_steps("backing up", |on_step| {
            for category in Category::PROJECT {
                on_step(category);
                seen.push(category);
            }
            Ok(seen.len())
        })
        .unwrap();
        assert_eq!(3, count);

        let failed: anyhow::Result<()> = with_steps("restoring", |on_step| {
            on_step(Category::Tape);
            Err(anyhow::anyhow!("device removed"))
        });
        assert_eq!("device removed", failed.unwrap_err().to_string());
    }
}
