//! JSON payload builders for the mock upstream server.

use serde_json::{Value, json};

/// Faction payload with the given members as `(id, name, last_action)`.
pub fn faction_payload(name: &str, members: &[(i64, &str, i64)]) -> Value {
    let members: serde_json::Map<String, Value> = members
        .iter()
        .map(|(id, member_name, last_action)| {
            (
                id.to_string(),
                json!({
                    "name": member_name,
                    "level": 42,
                    "last_action": {
                        "status": "Offline",
                        "timestamp": last_action,
                        "relative": "1 minute ago",
                    },
                }),
            )
        })
        .collect();

    json!({
        "ID": 9001,
        "name": name,
        "tag": "TEST",
        "members": members,
    })
}

/// Application-level error envelope as returned with HTTP 200.
pub fn error_payload(code: u16, message: &str) -> Value {
    json!({
        "error": {
            "code": code,
            "error": message,
        },
    })
}

/// One ranking page. `next` controls whether pagination metadata advertises a
/// further page.
pub fn ranking_page(entries: &[(i64, &str, i32, i32, &str)], next: bool) -> Value {
    let entries: Vec<Value> = entries
        .iter()
        .map(|(id, name, members, position, rank)| {
            json!({
                "id": id,
                "name": name,
                "members": members,
                "position": position,
                "rank": rank,
            })
        })
        .collect();

    let links = if next {
        json!({ "next": "https://api.example/page2", "prev": null })
    } else {
        json!({ "prev": null })
    };

    json!({
        "factionhof": entries,
        "_metadata": { "links": links },
    })
}
