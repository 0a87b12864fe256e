//! The interactive merge workflow: pick a base file, decide the three Custom
//! LED pages, confirm, save. Every screen offers a way back, previews run
//! between the menus, and quitting is possible from anywhere.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::catalog::{default_output_name, ensure_json_extension, Catalog};
use crate::config::AppConfig;
use crate::document::{Document, CUSTOM_LED_PAGES};
use crate::merge::{merge, MergeSelection, PageSource};
use crate::page::{combine_pages, PageView, MAX_FRAMES};
use crate::playback::DEFAULT_PREVIEW_DURATION_MS;
use crate::preview::{plan_pages, run_preview_in_session};
use crate::term::{self, Key, TerminalGuard};

const MENU_HINT: &str = "arrows or digits to choose, Enter to confirm, Esc to go back, q to quit";
const KEEP_LABEL: &str = "keep base";

enum MenuOutcome {
    Picked(usize),
    Back,
    Quit,
}

enum SessionOutcome {
    Quit,
    ReloadConfig,
}

enum BaseOutcome {
    Picked(String, Document),
    ReloadConfig,
    Quit,
}

enum LedOutcome {
    Chosen(PageSource, String),
    Back,
    Quit,
}

enum Pick<T> {
    Chosen(T),
    Cancelled,
    Quit,
}

enum SaveOutcome {
    Saved(PathBuf),
    Back,
    Quit,
}

/// Run the interactive merge workflow until the user quits. Written file
/// paths are echoed to stderr at the end, after the alternate screen is gone.
pub fn run_wizard(config_path: &Path) -> Result<()> {
    let mut written = Vec::new();
    let outcome = run_sessions(config_path, &mut written);
    for path in &written {
        eprintln!("[cbmerge] wrote {}", path.display());
    }
    outcome
}

fn run_sessions(config_path: &Path, written: &mut Vec<PathBuf>) -> Result<()> {
    loop {
        let config = AppConfig::load(config_path);
        for dir in config.ensure_directories()? {
            eprintln!("[cbmerge] created directory {}", dir.display());
        }
        let catalog = Catalog::new(&config);

        let guard = TerminalGuard::enter()?;
        let outcome = run_session(&catalog, written);
        guard.leave()?;
        match outcome? {
            SessionOutcome::Quit => return Ok(()),
            SessionOutcome::ReloadConfig => {}
        }
    }
}

fn run_session(catalog: &Catalog, written: &mut Vec<PathBuf>) -> Result<SessionOutcome> {
    'base: loop {
        let (base_name, base) = match pick_base(catalog)? {
            BaseOutcome::Picked(name, document) => (name, document),
            BaseOutcome::ReloadConfig => return Ok(SessionOutcome::ReloadConfig),
            BaseOutcome::Quit => return Ok(SessionOutcome::Quit),
        };

        if interrupted_by_quit(preview_leds(&base)?) {
            return Ok(SessionOutcome::Quit);
        }

        'mapping: loop {
            let mut selections = MergeSelection::new();
            let mut labels = [
                KEEP_LABEL.to_owned(),
                KEEP_LABEL.to_owned(),
                KEEP_LABEL.to_owned(),
            ];
            let mut slot = 0usize;
            while slot < CUSTOM_LED_PAGES.len() {
                match configure_led(catalog, &base, slot)? {
                    LedOutcome::Chosen(source, label) => {
                        selections.set(CUSTOM_LED_PAGES[slot], source);
                        labels[slot] = label;
                        slot += 1;
                    }
                    LedOutcome::Back => {
                        if slot == 0 {
                            continue 'base;
                        }
                        slot -= 1;
                    }
                    LedOutcome::Quit => return Ok(SessionOutcome::Quit),
                }
            }

            loop {
                let merged = match merge(&base, &selections) {
                    Ok(document) => document,
                    Err(error) => {
                        show_message(&format!("merge failed: {error}"))?;
                        continue 'mapping;
                    }
                };

                if interrupted_by_quit(preview_leds(&merged)?) {
                    return Ok(SessionOutcome::Quit);
                }

                let mut title = summary_title(&base_name, &labels);
                if selections.is_all_keep() {
                    title.push_str("\n\n  Saving now writes an unchanged copy.");
                }
                let items = to_owned_items(&[
                    "Proceed to save",
                    "Back to LED mapping",
                    "Restart from file selection",
                ]);
                match run_menu(&title, &items)? {
                    MenuOutcome::Picked(0) => match save_step(catalog, &merged, &base_name)? {
                        SaveOutcome::Saved(path) => {
                            written.push(path.clone());
                            let done = format!("Wrote {}", path.display());
                            let next = to_owned_items(&["Merge another set", "Quit"]);
                            match run_menu(&done, &next)? {
                                MenuOutcome::Picked(0) => continue 'base,
                                _ => return Ok(SessionOutcome::Quit),
                            }
                        }
                        SaveOutcome::Back => continue,
                        SaveOutcome::Quit => return Ok(SessionOutcome::Quit),
                    },
                    MenuOutcome::Picked(1) | MenuOutcome::Back => continue 'mapping,
                    MenuOutcome::Picked(_) => continue 'base,
                    MenuOutcome::Quit => return Ok(SessionOutcome::Quit),
                }
            }
        }
    }
}

fn pick_base(catalog: &Catalog) -> Result<BaseOutcome> {
    loop {
        let files = catalog.loadable_files()?;
        if files.is_empty() {
            let title = format!("No usable .json files in {}", catalog.source_dir().display());
            let items = to_owned_items(&["Rescan", "Reload config.toml and rescan", "Quit"]);
            match run_menu(&title, &items)? {
                MenuOutcome::Picked(0) | MenuOutcome::Back => continue,
                MenuOutcome::Picked(1) => return Ok(BaseOutcome::ReloadConfig),
                _ => return Ok(BaseOutcome::Quit),
            }
        }

        let index = match run_menu("Choose the base file", &files)? {
            MenuOutcome::Picked(index) => index,
            MenuOutcome::Back => continue,
            MenuOutcome::Quit => return Ok(BaseOutcome::Quit),
        };

        let name = files[index].clone();
        let document = match catalog.load(&name) {
            Ok(document) => document,
            Err(error) => {
                show_message(&format!("{error:#}"))?;
                continue;
            }
        };
        if let Err(error) = document.validate() {
            show_message(&format!("{name}: {error}"))?;
            continue;
        }
        return Ok(BaseOutcome::Picked(name, document));
    }
}

fn configure_led(catalog: &Catalog, base: &Document, slot: usize) -> Result<LedOutcome> {
    let target_page = CUSTOM_LED_PAGES[slot];
    loop {
        let previews = plan_pages(base, &[target_page]);
        if interrupted_by_quit(run_preview_in_session(&previews, DEFAULT_PREVIEW_DURATION_MS)?) {
            return Ok(LedOutcome::Quit);
        }

        let title = format!("Custom LED {} (page {target_page})", slot + 1);
        let items = to_owned_items(&[
            "Keep base",
            "Replace from another file",
            "Combine with another file",
            "Preview again",
        ]);
        match run_menu(&title, &items)? {
            MenuOutcome::Picked(0) => {
                return Ok(LedOutcome::Chosen(PageSource::KeepBase, KEEP_LABEL.to_owned()))
            }
            MenuOutcome::Picked(1) => match pick_replacement(catalog, target_page)? {
                Pick::Chosen((source, label)) => return Ok(LedOutcome::Chosen(source, label)),
                Pick::Cancelled => {}
                Pick::Quit => return Ok(LedOutcome::Quit),
            },
            MenuOutcome::Picked(2) => match pick_combination(catalog, base, target_page)? {
                Pick::Chosen((source, label)) => return Ok(LedOutcome::Chosen(source, label)),
                Pick::Cancelled => {}
                Pick::Quit => return Ok(LedOutcome::Quit),
            },
            MenuOutcome::Picked(_) => {}
            MenuOutcome::Back => return Ok(LedOutcome::Back),
            MenuOutcome::Quit => return Ok(LedOutcome::Quit),
        }
    }
}

fn pick_source_document(catalog: &Catalog) -> Result<Pick<(String, Document)>> {
    loop {
        let files = catalog.loadable_files()?;
        if files.is_empty() {
            show_message("no usable .json files to pick from")?;
            return Ok(Pick::Cancelled);
        }
        let index = match run_menu("Select the source file", &files)? {
            MenuOutcome::Picked(index) => index,
            MenuOutcome::Back => return Ok(Pick::Cancelled),
            MenuOutcome::Quit => return Ok(Pick::Quit),
        };
        let name = files[index].clone();
        let document = match catalog.load(&name) {
            Ok(document) => document,
            Err(error) => {
                show_message(&format!("{error:#}"))?;
                continue;
            }
        };
        if let Err(error) = document.validate() {
            show_message(&format!("{name}: {error}"))?;
            continue;
        }
        return Ok(Pick::Chosen((name, document)));
    }
}

fn pick_replacement(catalog: &Catalog, target_page: usize) -> Result<Pick<(PageSource, String)>> {
    let (name, document) = match pick_source_document(catalog)? {
        Pick::Chosen(picked) => picked,
        Pick::Cancelled => return Ok(Pick::Cancelled),
        Pick::Quit => return Ok(Pick::Quit),
    };

    let previews = plan_pages(&document, &CUSTOM_LED_PAGES);
    if interrupted_by_quit(run_preview_in_session(&previews, DEFAULT_PREVIEW_DURATION_MS)?) {
        return Ok(Pick::Quit);
    }

    let items = previews
        .iter()
        .map(|preview| {
            format!(
                "Custom LED {} (page {}, {} frames)",
                preview.page_index - 4,
                preview.page_index,
                preview.model.frame_count()
            )
        })
        .collect::<Vec<_>>();

    let title = format!("Which LED of {name} should fill page {target_page}?");
    match run_menu(&title, &items)? {
        MenuOutcome::Picked(index) => {
            let source_page = CUSTOM_LED_PAGES[index];
            let label = format!("replace with {name} page {source_page}");
            Ok(Pick::Chosen((
                PageSource::Replace {
                    document,
                    page_index: source_page,
                },
                label,
            )))
        }
        MenuOutcome::Back => Ok(Pick::Cancelled),
        MenuOutcome::Quit => Ok(Pick::Quit),
    }
}

fn pick_combination(
    catalog: &Catalog,
    base: &Document,
    target_page: usize,
) -> Result<Pick<(PageSource, String)>> {
    let base_page = match base.page(target_page) {
        Some(page) => page,
        None => {
            show_message(&format!("base document has no page {target_page}"))?;
            return Ok(Pick::Cancelled);
        }
    };
    if PageView::new(base_page).active_frame_set().is_none() {
        show_message(&format!(
            "page {target_page} of the base has no frame animation to extend"
        ))?;
        return Ok(Pick::Cancelled);
    }
    let base_frames = PageView::new(base_page).frame_count();

    let (name, document) = match pick_source_document(catalog)? {
        Pick::Chosen(picked) => picked,
        Pick::Cancelled => return Ok(Pick::Cancelled),
        Pick::Quit => return Ok(Pick::Quit),
    };

    let previews = plan_pages(&document, &CUSTOM_LED_PAGES);
    if interrupted_by_quit(run_preview_in_session(&previews, DEFAULT_PREVIEW_DURATION_MS)?) {
        return Ok(Pick::Quit);
    }

    // only offer LEDs that contribute frames and stay under the device limit
    let mut candidates = Vec::new();
    for &source_page in &CUSTOM_LED_PAGES {
        let count = document
            .page(source_page)
            .map(|page| PageView::new(page).frame_count())
            .unwrap_or(0);
        if count > 0 && fits_device_limit(base_frames, count) {
            candidates.push((source_page, count));
        }
    }
    if candidates.is_empty() {
        show_message(&format!(
            "no LED of {name} fits page {target_page} under the {MAX_FRAMES}-frame limit"
        ))?;
        return Ok(Pick::Cancelled);
    }

    let items = candidates
        .iter()
        .map(|&(source_page, count)| {
            format!(
                "Custom LED {} (page {source_page}, {count} frames, {} total)",
                source_page - 4,
                base_frames + count
            )
        })
        .collect::<Vec<_>>();

    let title = format!("Combine page {target_page} of the base with which LED of {name}?");
    match run_menu(&title, &items)? {
        MenuOutcome::Picked(index) => {
            let (source_page, count) = candidates[index];
            let source_value = match document.page(source_page) {
                Some(page) => page,
                None => {
                    show_message(&format!("{name} has no page {source_page}"))?;
                    return Ok(Pick::Cancelled);
                }
            };
            match combine_pages(base_page, &[source_value]) {
                Ok(combined) => {
                    let label = format!(
                        "combine with {name} page {source_page} ({} frames total)",
                        base_frames + count
                    );
                    Ok(Pick::Chosen((PageSource::Prepared(combined), label)))
                }
                Err(error) => {
                    show_message(&error.to_string())?;
                    Ok(Pick::Cancelled)
                }
            }
        }
        MenuOutcome::Back => Ok(Pick::Cancelled),
        MenuOutcome::Quit => Ok(Pick::Quit),
    }
}

fn save_step(catalog: &Catalog, merged: &Document, base_name: &str) -> Result<SaveOutcome> {
    loop {
        let items = to_owned_items(&["Save as new file", "Overwrite base file"]);
        match run_menu("Save method", &items)? {
            MenuOutcome::Picked(0) => {
                let Some(file_name) = prompt_filename(&default_output_name())? else {
                    continue;
                };
                match catalog.save(merged, &file_name, false) {
                    Ok(path) => return Ok(SaveOutcome::Saved(path)),
                    Err(error) => show_message(&format!("save failed: {error:#}"))?,
                }
            }
            MenuOutcome::Picked(_) => {
                let title = format!("Overwrite {base_name}? This cannot be undone.");
                let confirm = to_owned_items(&["Yes, overwrite", "No, go back"]);
                match run_menu(&title, &confirm)? {
                    MenuOutcome::Picked(0) => match catalog.save(merged, base_name, true) {
                        Ok(path) => return Ok(SaveOutcome::Saved(path)),
                        Err(error) => show_message(&format!("save failed: {error:#}"))?,
                    },
                    MenuOutcome::Quit => return Ok(SaveOutcome::Quit),
                    _ => {}
                }
            }
            MenuOutcome::Back => return Ok(SaveOutcome::Back),
            MenuOutcome::Quit => return Ok(SaveOutcome::Quit),
        }
    }
}

fn preview_leds(document: &Document) -> Result<Option<Key>> {
    let previews = plan_pages(document, &CUSTOM_LED_PAGES);
    run_preview_in_session(&previews, DEFAULT_PREVIEW_DURATION_MS)
}

fn run_menu(title: &str, items: &[String]) -> Result<MenuOutcome> {
    let mut cursor = 0usize;
    loop {
        let mut screen = String::new();
        screen.push_str(title);
        screen.push_str("\n\n");
        for (index, item) in items.iter().enumerate() {
            let marker = if index == cursor { '>' } else { ' ' };
            screen.push_str(&format!(" {marker} {}) {item}\n", index + 1));
        }
        screen.push('\n');
        screen.push_str(MENU_HINT);
        term::draw_screen(&screen)?;

        match term::wait_key()? {
            Key::Up => cursor = cursor.saturating_sub(1),
            Key::Down => {
                if cursor + 1 < items.len() {
                    cursor += 1;
                }
            }
            Key::Enter => return Ok(MenuOutcome::Picked(cursor)),
            Key::Digit(digit) => {
                let position = digit as usize;
                if position >= 1 && position <= items.len() {
                    return Ok(MenuOutcome::Picked(position - 1));
                }
            }
            Key::Esc => return Ok(MenuOutcome::Back),
            Key::Char(c) if c.eq_ignore_ascii_case(&'q') => return Ok(MenuOutcome::Quit),
            Key::CtrlC => return Ok(MenuOutcome::Quit),
            _ => {}
        }
    }
}

fn prompt_filename(default_name: &str) -> Result<Option<String>> {
    let mut buffer = String::new();
    loop {
        let shown = if buffer.is_empty() {
            format!("(default: {default_name})")
        } else {
            buffer.clone()
        };
        let screen = format!("Name for the merged file\n\n> {shown}\n\nEnter accepts, Esc cancels");
        term::draw_screen(&screen)?;

        match term::wait_key()? {
            Key::Enter => {
                let name = if buffer.trim().is_empty() {
                    default_name.to_owned()
                } else {
                    ensure_json_extension(buffer.trim())
                };
                return Ok(Some(name));
            }
            Key::Esc | Key::CtrlC => return Ok(None),
            Key::Backspace => {
                buffer.pop();
            }
            Key::Digit(digit) => buffer.push(char::from(b'0' + digit)),
            Key::Char(c) if !c.is_control() => buffer.push(c),
            _ => {}
        }
    }
}

fn show_message(message: &str) -> Result<()> {
    term::draw_screen(&format!("{message}\n\npress any key"))?;
    term::wait_key()?;
    Ok(())
}

fn summary_title(base_name: &str, labels: &[String; 3]) -> String {
    let mut lines = vec![format!("Merge summary for {base_name}")];
    for (slot, label) in labels.iter().enumerate() {
        lines.push(format!(
            "  Custom LED {} (page {}): {label}",
            slot + 1,
            CUSTOM_LED_PAGES[slot]
        ));
    }
    lines.join("\n")
}

fn fits_device_limit(base_frames: usize, extra_frames: usize) -> bool {
    base_frames + extra_frames <= MAX_FRAMES
}

fn interrupted_by_quit(key: Option<Key>) -> bool {
    matches!(key, Some(Key::CtrlC)) || matches!(key, Some(Key::Char(c)) if c.eq_ignore_ascii_case(&'q'))
}

fn to_owned_items(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_owned()).collect()
}
