//! The `events` command.

use chrono::Local;
use schoolfeed_server::EventFeed;
use tracing::debug;

use crate::cli::EventsArgs;
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::render;

/// Fetches the feed for the requested range and prints it.
pub async fn run(args: &EventsArgs, config: &ClientConfig) -> ClientResult<()> {
    let range = args.range(Local::now().date_naive())?;
    let person = args.person();
    debug!(start = %range.start, end = %range.end, ?person, "Requesting events");

    let feed = EventFeed::new(config.to_feed_config()?)?;
    let days = feed.get_events(&range, person.as_ref()).await?;

    if args.json {
        println!("{}", render::format_json(&days)?);
    } else {
        print!("{}", render::format_text(&days));
    }
    Ok(())
}
