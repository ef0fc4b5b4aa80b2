//! Message history command.

use anyhow::Result;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;

use relay_core::store::MessageStore;
use relay_types::message::Message;

/// Print every stored message, oldest first.
pub async fn history<S: MessageStore>(store: &S, json: bool) -> Result<()> {
    let messages = store.list_all().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    if messages.is_empty() {
        println!();
        println!(
            "  {} No messages stored yet. Start the relay with: {}",
            style("i").blue().bold(),
            style("relayd serve").yellow()
        );
        println!();
        return Ok(());
    }

    println!();
    println!("{}", history_table(&messages));
    println!();
    println!(
        "  {} message{}",
        style(messages.len()).bold(),
        if messages.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

fn history_table(messages: &[Message]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Time").fg(Color::White),
        Cell::new("Sender").fg(Color::White),
        Cell::new("Type").fg(Color::White),
        Cell::new("Content").fg(Color::White),
    ]);

    for msg in messages {
        let id = msg.id.map(|id| id.to_string()).unwrap_or_default();
        table.add_row(vec![
            Cell::new(id).fg(Color::DarkGrey),
            Cell::new(&msg.timestamp).fg(Color::DarkGrey),
            Cell::new(&msg.sender_id).fg(Color::Cyan),
            Cell::new(&msg.message_type),
            Cell::new(&msg.content),
        ]);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_types::message::MessageId;

    #[test]
    fn test_history_table_has_one_row_per_message() {
        let messages = vec![
            Message {
                id: Some(MessageId(1)),
                timestamp: "2026-01-01T00:00:00.000Z".to_string(),
                ..Message::new("text", "hello", "alice")
            },
            Message {
                id: Some(MessageId(2)),
                timestamp: "2026-01-01T00:00:01.000Z".to_string(),
                ..Message::new("text", "hey", "bob")
            },
        ];

        let table = history_table(&messages);
        assert_eq!(table.row_iter().count(), 2);

        let rendered = table.to_string();
        assert!(rendered.contains("alice"));
        assert!(rendered.contains("hey"));
    }
}
