// SPDX-License-Identifier: MIT

//! `mb ls [-q SUBSTR] [-t TAG]...` — list completed titles (spec §6).

use mediabin_wire::ArgValue;

use crate::client::Client;
use crate::exit_error::ExitError;

pub async fn ls(client: &mut Client, query: Option<&str>, tags: &[String]) -> Result<(), ExitError> {
    let mut kwargs = std::collections::HashMap::new();
    if let Some(q) = query {
        kwargs.insert("q".to_string(), ArgValue::String(q.to_string()));
    }
    if !tags.is_empty() {
        kwargs.insert("t".to_string(), ArgValue::List(tags.iter().map(|t| ArgValue::String(t.clone())).collect()));
    }

    let value = client.call("ls", vec![], kwargs).await?;
    let items = value.get("items").and_then(|v| v.as_array()).cloned().unwrap_or_default();

    if items.is_empty() {
        println!("no completed items");
        return Ok(());
    }
    for item in items {
        let title = item.get("title").and_then(|v| v.as_str()).unwrap_or("?");
        println!("{title}");
    }
    Ok(())
}
