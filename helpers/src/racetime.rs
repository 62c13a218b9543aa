/// Number of centiseconds per second, the time unit used throughout the race bot.
pub const CENTIS_PER_SEC: u32 = 100;

/// to_str formats a time given in centiseconds as `[m]m:ss.hh`, or `h:mm:ss.hh` from one hour
/// onwards.
pub fn to_str(centis: u32) -> String {
    let hundredths = centis % 100;
    let tot_secs = centis / CENTIS_PER_SEC;
    let secs = tot_secs % 60;
    let tot_mins = tot_secs / 60;

    if tot_mins < 60 {
        format!("{}:{:02}.{:02}", tot_mins, secs, hundredths)
    } else {
        format!(
            "{}:{:02}:{:02}.{:02}",
            tot_mins / 60,
            tot_mins % 60,
            secs,
            hundredths
        )
    }
}

