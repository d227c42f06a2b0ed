// SPDX-License-Identifier: MIT

//! `mb i <url>` — enqueue a download (spec §6).

use crate::client::Client;
use crate::exit_error::ExitError;

pub async fn enqueue(client: &mut Client, url: &str) -> Result<(), ExitError> {
    let value = client.call("i", vec![url.into()], Default::default()).await?;
    let id = value.get("id").and_then(|v| v.as_str()).unwrap_or("?");
    let status = value.get("status").and_then(|v| v.as_str()).unwrap_or("?");
    match status {
        "duplicate" => println!("already known: {id}"),
        _ => println!("enqueued {id}"),
    }
    Ok(())
}
