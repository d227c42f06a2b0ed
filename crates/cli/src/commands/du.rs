// SPDX-License-Identifier: MIT

//! `mb du` — show disk usage under the data directory (spec §6).

use crate::client::Client;
use crate::exit_error::ExitError;

pub async fn du(client: &mut Client) -> Result<(), ExitError> {
    let value = client.call("du", vec![], Default::default()).await?;
    let datadir = value.get("datadir").and_then(|v| v.as_str()).unwrap_or("?");
    let total_bytes = value.get("total_bytes").and_then(|v| v.as_u64()).unwrap_or(0);
    println!("{}: {}", datadir, human_bytes(total_bytes));
    Ok(())
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[0])
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_small_sizes_in_bytes() {
        assert_eq!(human_bytes(512), "512 B");
    }

    #[test]
    fn formats_larger_sizes_with_unit() {
        assert_eq!(human_bytes(10 * 1024 * 1024), "10.00 MiB");
    }
}
