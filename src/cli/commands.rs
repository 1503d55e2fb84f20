use std::fmt::Write as _;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use crate::app::{Board, DeleteOutcome};
use crate::cards::{Card, CardActions, CardFields, CardHandle};
use crate::placeholders::PlaceholderRegistry;
use crate::search::{QueryOutcome, TagCloud, TagCount};
use crate::session::CommitOutcome;

use super::Commands;

#[derive(Args, Debug, Clone, Default)]
pub struct NewArgs {
    /// Title for the card (prompted if omitted)
    #[arg()]
    pub title: Option<String>,
    /// Card text. If omitted, reads from stdin.
    #[arg(long)]
    pub text: Option<String>,
    /// URL to attach (repeatable)
    #[arg(long = "url")]
    pub urls: Vec<String>,
    /// Comma separated tags
    #[arg(long)]
    pub tags: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Case-insensitive title filter; `tag:` words select tags
    #[arg(long)]
    pub search: Option<String>,
    /// Only cards carrying every given tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CardArgs {
    /// Card position as shown by `list` (starting at 1)
    pub index: usize,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// Card position as shown by `list` (starting at 1)
    pub index: usize,
    /// New text. If omitted, reads from stdin.
    #[arg(long)]
    pub text: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Card position as shown by `list` (starting at 1)
    pub index: usize,
    /// Skip the confirmation prompt
    #[arg(long)]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// JSON file in the export layout, its legacy variant, or the demo layout
    pub file: PathBuf,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ExportArgs {
    /// Directory for the dated export file (defaults to the configured one)
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ThemeArgs {
    #[command(subcommand)]
    pub action: Option<ThemeAction>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ThemeAction {
    /// Switch between light and dark
    Toggle,
}

/// Runs one command against the board and returns what should be printed.
pub fn execute(board: &mut Board, command: Commands) -> Result<String> {
    match command {
        Commands::New(args) => new_card(board, args),
        Commands::List(args) => list_cards(board, &args),
        Commands::Tags => Ok(format_tag_cloud(board.tag_cloud())),
        Commands::Show(args) => {
            let handle = card_at(board, args.index)?;
            let card = board.card(handle).context("card vanished")?;
            Ok(format_card(args.index, card))
        }
        Commands::Edit(args) => edit_card(board, args),
        Commands::Copy(args) => {
            let handle = card_at(board, args.index)?;
            if !board.copy_card(handle, None) {
                bail!("copying card #{} failed", args.index);
            }
            Ok(String::new())
        }
        Commands::Open(args) => {
            let handle = card_at(board, args.index)?;
            if board.card(handle).is_some_and(|card| card.urls().is_empty()) {
                bail!("card #{} has no URLs", args.index);
            }
            if !board.open_urls(handle) {
                bail!("some URLs on card #{} could not be opened", args.index);
            }
            Ok(String::new())
        }
        Commands::Delete(args) => delete_card(board, args),
        Commands::Import(args) => {
            let count = board.import_file(&args.file)?;
            Ok(format!("Imported {}", plural(count, "card")))
        }
        Commands::Export(args) => {
            let path = match args.out {
                Some(dir) => board.export_to(&dir)?,
                None => board.export()?,
            };
            Ok(format!("Exported to {}", path.display()))
        }
        Commands::Placeholders => Ok(format_placeholders(board.placeholders())),
        Commands::Theme(args) => {
            let theme = match args.action {
                Some(ThemeAction::Toggle) => board.toggle_theme()?,
                None => board.theme(),
            };
            Ok(format!("Theme: {theme}"))
        }
        Commands::Render(args) => {
            let handle = card_at(board, args.index)?;
            match board.render_card(handle) {
                Some(html) => Ok(html),
                None => bail!("markdown rendering is not available"),
            }
        }
    }
}

fn new_card(board: &mut Board, args: NewArgs) -> Result<String> {
    let title = match args.title {
        Some(title) => title,
        None => prompt("Title")?,
    };
    let text = match args.text {
        Some(text) => text,
        None => read_stdin()?.unwrap_or_default(),
    };
    let mut fields = CardFields::new(title.trim()).with_text(text).with_urls(args.urls);
    if let Some(tags) = args.tags.as_deref() {
        fields = fields.with_tags(crate::cards::parse_tag_list(tags));
    }
    board.create_card(Some(fields));
    board.save().context("saving new card")?;
    Ok(format!("Created card #{}", board.cards().len()))
}

fn list_cards(board: &mut Board, args: &ListArgs) -> Result<String> {
    board.clear_filters();
    if let Some(search) = args.search.as_deref() {
        let parsed = crate::search::parse_query(search);
        board.set_search(parsed.search_text());
        for tag in parsed.active_tags() {
            if !board.query().is_active(tag) {
                board.toggle_tag(tag);
            }
        }
    }
    for tag in &args.tags {
        if !board.query().is_active(tag) {
            board.toggle_tag(tag);
        }
    }
    board.settle();
    Ok(format_listing(board.cards(), board.visibility()))
}

fn edit_card(board: &mut Board, args: EditArgs) -> Result<String> {
    let handle = card_at(board, args.index)?;
    let text = match args.text {
        Some(text) => text,
        None => match read_stdin()? {
            Some(text) => text,
            None => bail!("provide --text or pipe the new text on stdin"),
        },
    };
    board.begin_edit(handle)?;
    board.set_edit_buffer(text)?;
    match board.commit_edit()? {
        CommitOutcome::Written(_) => Ok(format!("Updated card #{}", args.index)),
        CommitOutcome::Voided(_) => bail!("card #{} was removed during the edit", args.index),
    }
}

fn delete_card(board: &mut Board, args: DeleteArgs) -> Result<String> {
    let handle = card_at(board, args.index)?;
    let mut prompt_error = None;
    let outcome = board.delete_card(handle, |card| {
        if args.yes {
            return true;
        }
        match prompt(&format!("Delete \"{}\"? [y/N]", card.title())) {
            Ok(answer) => matches!(answer.trim(), "y" | "Y" | "yes"),
            Err(err) => {
                prompt_error = Some(err);
                false
            }
        }
    });
    if let Some(err) = prompt_error {
        return Err(err.context("reading confirmation"));
    }
    Ok(match outcome {
        DeleteOutcome::Deleted => format!("Deleted card #{}", args.index),
        DeleteOutcome::Declined => "Kept card".to_string(),
        DeleteOutcome::Missing => format!("No card #{}", args.index),
    })
}

fn card_at(board: &Board, index: usize) -> Result<CardHandle> {
    index
        .checked_sub(1)
        .and_then(|position| board.handle_at(position))
        .with_context(|| format!("no card #{index} (there are {})", board.cards().len()))
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;
    let mut stdout = io::stdout();
    write!(stdout, "{}: ", label)?;
    stdout.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end().to_owned())
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf))
}

fn format_listing(cards: &[Card], outcome: &QueryOutcome) -> String {
    let mut out = String::new();
    for (position, card) in cards.iter().enumerate() {
        if !outcome.is_visible(card.handle()) {
            continue;
        }
        let _ = write!(&mut out, "#{}  {}", position + 1, card.title());
        let markers = format_actions(card.actions());
        if !markers.is_empty() {
            let _ = write!(&mut out, "  {markers}");
        }
        if !card.tags().is_empty() {
            let _ = write!(&mut out, "  {}", format_tags(card.tags()));
        }
        out.push('\n');
    }
    out.push_str(&outcome.count_label());
    out
}

fn format_card(index: usize, card: &Card) -> String {
    let mut out = format!("#{index}  {}", card.title());
    for url in card.urls() {
        let _ = write!(&mut out, "\n    url   {url}");
    }
    if !card.tags().is_empty() {
        let _ = write!(&mut out, "\n    tags  {}", format_tags(card.tags()));
    }
    if !card.text().is_empty() {
        let _ = write!(&mut out, "\n\n{}", card.text());
    }
    out
}

fn format_actions(actions: CardActions) -> String {
    let mut markers = Vec::new();
    if actions.contains(CardActions::COPY_TEXT) {
        markers.push("[copy]");
    }
    if actions.contains(CardActions::OPEN_URLS) {
        markers.push("[links]");
    }
    markers.join(" ")
}

fn format_tag_cloud(cloud: &TagCloud) -> String {
    if cloud.is_empty() {
        return "No tags yet.".to_string();
    }
    let row = |entries: &[TagCount]| {
        entries
            .iter()
            .map(|entry| format!("{} ({})", entry.tag, entry.count))
            .collect::<Vec<_>>()
            .join("  ")
    };
    [&cloud.upper, &cloud.lower]
        .into_iter()
        .filter(|entries| !entries.is_empty())
        .map(|entries| row(entries.as_slice()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_placeholders(registry: &PlaceholderRegistry) -> String {
    registry
        .iter()
        .map(|placeholder| {
            format!(
                "{}\n    {}\n    e.g. {}",
                placeholder.token(),
                placeholder.description,
                placeholder.example
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| format!("#{}", tag))
        .collect::<Vec<_>>()
        .join(" ")
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::Fixture;
    use crate::storage::{KeyValueStore, CARDS_KEY};
    use tempfile::TempDir;

    type TestResult<T = ()> = Result<T>;

    fn seeded(fixture: &Fixture) -> Board {
        let mut board = fixture.board();
        board.create_card(Some(
            CardFields::new("Draft reply")
                .with_text("Hi {clipboard}")
                .with_tags(["Ops", "mail"]),
        ));
        board.create_card(Some(
            CardFields::new("Release notes")
                .with_urls(["https://example.com/notes"])
                .with_tags(["mail"]),
        ));
        board.create_card(Some(CardFields::new("Scratch")));
        board.settle();
        board
    }

    #[test]
    fn cli_list_filters_by_search_and_tags() -> TestResult {
        let fixture = Fixture::new();
        let mut board = seeded(&fixture);
        let output = execute(
            &mut board,
            Commands::List(ListArgs {
                search: Some("tag:mail notes".into()),
                tags: Vec::new(),
            }),
        )?;
        insta::assert_snapshot!(output, @r"
        #2  Release notes  [links]  #mail
        1 result
        ");
        Ok(())
    }

    #[test]
    fn cli_list_starts_from_clean_filters() -> TestResult {
        let fixture = Fixture::new();
        let mut board = seeded(&fixture);
        board.toggle_tag("Ops");
        board.set_search("scratch");
        let output = execute(&mut board, Commands::List(ListArgs::default()))?;
        assert!(output.ends_with("3 results"));
        assert!(!board.query().has_filters());
        Ok(())
    }

    #[test]
    fn cli_list_marks_card_actions() -> TestResult {
        let fixture = Fixture::new();
        let mut board = seeded(&fixture);
        let output = execute(&mut board, Commands::List(ListArgs::default()))?;
        assert!(output.starts_with("#1  Draft reply  [copy]  #Ops #mail\n"));
        assert!(output.ends_with("3 results"));
        Ok(())
    }

    #[test]
    fn cli_tags_prints_both_rows() -> TestResult {
        let fixture = Fixture::new();
        let mut board = seeded(&fixture);
        let output = execute(&mut board, Commands::Tags)?;
        insta::assert_snapshot!(output, @r"
        Ops (1)
        mail (2)
        ");
        Ok(())
    }

    #[test]
    fn cli_new_saves_card() -> TestResult {
        let fixture = Fixture::new();
        let mut board = fixture.board();
        let output = execute(
            &mut board,
            Commands::New(NewArgs {
                title: Some("  Fresh ".into()),
                text: Some("body".into()),
                urls: vec!["https://a".into()],
                tags: Some("x, y,,x".into()),
            }),
        )?;
        assert_eq!(output, "Created card #1");
        assert_eq!(board.cards()[0].title(), "Fresh");
        assert_eq!(board.cards()[0].tags(), ["x", "y"]);
        assert!(fixture.storage.get(CARDS_KEY)?.is_some());
        Ok(())
    }

    #[test]
    fn cli_edit_replaces_text() -> TestResult {
        let fixture = Fixture::new();
        let mut board = seeded(&fixture);
        let output = execute(
            &mut board,
            Commands::Edit(EditArgs {
                index: 3,
                text: Some("rewritten".into()),
            }),
        )?;
        assert_eq!(output, "Updated card #3");
        assert_eq!(board.cards()[2].text(), "rewritten");
        Ok(())
    }

    #[test]
    fn cli_rejects_out_of_range_positions() {
        let fixture = Fixture::new();
        let mut board = seeded(&fixture);
        for index in [0, 4] {
            let result = execute(&mut board, Commands::Show(CardArgs { index }));
            assert!(result.is_err(), "index {index} should be rejected");
        }
    }

    #[test]
    fn cli_delete_with_yes_skips_prompt() -> TestResult {
        let fixture = Fixture::new();
        let mut board = seeded(&fixture);
        let output = execute(
            &mut board,
            Commands::Delete(DeleteArgs {
                index: 1,
                yes: true,
            }),
        )?;
        assert_eq!(output, "Deleted card #1");
        assert_eq!(board.cards().len(), 2);
        assert_eq!(board.cards()[0].title(), "Release notes");
        Ok(())
    }

    #[test]
    fn cli_copy_writes_resolved_text() -> TestResult {
        let fixture = Fixture::new();
        let mut board = seeded(&fixture);
        execute(&mut board, Commands::Copy(CardArgs { index: 1 }))?;
        assert_eq!(fixture.clipboard.contents().as_deref(), Some("Hi clip"));
        Ok(())
    }

    #[test]
    fn cli_open_requires_urls() -> TestResult {
        let fixture = Fixture::new();
        let mut board = seeded(&fixture);
        assert!(execute(&mut board, Commands::Open(CardArgs { index: 1 })).is_err());
        execute(&mut board, Commands::Open(CardArgs { index: 2 }))?;
        assert_eq!(fixture.opener.opened(), ["https://example.com/notes"]);
        Ok(())
    }

    #[test]
    fn cli_export_then_import_restores_cards() -> TestResult {
        let temp = TempDir::new()?;
        let fixture = Fixture::new();
        let mut board = seeded(&fixture);
        let output = execute(
            &mut board,
            Commands::Export(ExportArgs {
                out: Some(temp.path().to_path_buf()),
            }),
        )?;
        let path = temp.path().join("cards_2025-02-19.json");
        assert_eq!(output, format!("Exported to {}", path.display()));

        let other = Fixture::new();
        let mut restored = other.board();
        let output = execute(&mut restored, Commands::Import(ImportArgs { file: path }))?;
        assert_eq!(output, "Imported 3 cards");
        assert_eq!(
            restored.store().serialize(),
            board.store().serialize()
        );
        Ok(())
    }

    #[test]
    fn cli_placeholders_lists_builtins() -> TestResult {
        let fixture = Fixture::new();
        let mut board = fixture.board();
        let output = execute(&mut board, Commands::Placeholders)?;
        insta::assert_snapshot!(output, @r"
        {YYYY-MM-DD_HH-mm-SS}
            Current local date and time as YYYY-MM-DD_HH-mm-SS
            e.g. 2025-02-19_15-39-05
        {clipboard}
            Current clipboard contents
            e.g. Copied text...
        ");
        Ok(())
    }

    #[test]
    fn cli_theme_toggles() -> TestResult {
        let fixture = Fixture::new();
        let mut board = fixture.board();
        let shown = execute(&mut board, Commands::Theme(ThemeArgs::default()))?;
        assert_eq!(shown, "Theme: light");
        let toggled = execute(
            &mut board,
            Commands::Theme(ThemeArgs {
                action: Some(ThemeAction::Toggle),
            }),
        )?;
        assert_eq!(toggled, "Theme: dark");
        Ok(())
    }
}
