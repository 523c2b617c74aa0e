//! HTML for the weather page.

use chrono::DateTime;
use weatherwatch_weather::WeatherReport;

const HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Weather</title>
</head>
<body>
<form action="/weather" method="get">
    <label for="city">City: </label>
    <input type="text" id="city" name="city">
    <input type="submit" value="Search">
</form>
"#;

const FOOT: &str = "</body>\n</html>\n";

/// Escape text for use in element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// What goes between the search form and the footer
#[derive(Debug)]
pub enum PageBody<'a> {
    /// Only the search form
    Empty,
    Report(&'a WeatherReport),
    Error { city: &'a str, message: &'a str },
}

pub fn render_page(body: PageBody<'_>, notices: &[&str]) -> String {
    let mut html = String::from(HEAD);

    for notice in notices {
        html.push_str(&format!("<p class=\"notice\">{}</p>\n", escape(notice)));
    }

    match body {
        PageBody::Empty => {}
        PageBody::Report(report) => html.push_str(&render_report(report)),
        PageBody::Error { city, message } => html.push_str(&format!(
            "<div class=\"error\"><h1>{}</h1><p>{}</p></div>\n",
            escape(city),
            escape(message)
        )),
    }

    html.push_str(FOOT);
    html
}

fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| escape(&v.to_string()))
}

fn unix_time(secs: Option<i64>) -> String {
    match secs.and_then(|s| DateTime::from_timestamp(s, 0)) {
        Some(t) => format!("{} ({})", t.timestamp(), t.format("%Y-%m-%d %H:%M:%S UTC")),
        None => "-".to_string(),
    }
}

fn render_report(report: &WeatherReport) -> String {
    let mut html = String::new();
    let main = &report.main;

    html.push_str(&format!(
        "<div class=\"name\"><h1><b>{}</b></h1></div>\n",
        escape(&report.name)
    ));

    html.push_str(&format!(
        "<div class=\"coord\">\nCoordinates:<br>\nLongitude {}<br>\nLatitude {}\n</div>\n",
        opt(report.coord.as_ref().map(|c| c.lon)),
        opt(report.coord.as_ref().map(|c| c.lat)),
    ));

    if let Some(w) = report.weather.first() {
        html.push_str(&format!(
            "<div class=\"weather\">\nWeather:<br>\nID {}<br>\nMain {}<br>\nDescription {}<br>\nIcon {}\n</div>\n",
            w.id,
            escape(&w.main),
            escape(&w.description),
            escape(&w.icon),
        ));
    }

    html.push_str(&format!(
        "<div class=\"base\">Base: {}</div>\n",
        opt(report.base.as_deref())
    ));

    html.push_str(&format!(
        "<div class=\"main\">\nMain:<br>\n\
         Temperature {} °C<br>\n\
         Feels like {} °C<br>\n\
         Temperature min {} °C<br>\n\
         Temperature max {} °C<br>\n\
         Pressure {} hPa<br>\n\
         Humidity {} %<br>\n</div>\n",
        main.temp,
        opt(main.feels_like),
        opt(main.temp_min),
        opt(main.temp_max),
        main.pressure,
        main.humidity,
    ));

    html.push_str(&format!(
        "<div class=\"visibility\">Visibility: {} m</div>\n",
        opt(report.visibility)
    ));

    let wind = report.wind.clone().unwrap_or_default();
    html.push_str(&format!(
        "<div class=\"wind\">\nWind:<br>\nSpeed {} m/s<br>\nDegree {}<br>\n</div>\n",
        wind.speed,
        opt(wind.deg),
    ));

    html.push_str(&format!(
        "<div class=\"rain\">Rain: {}</div>\n",
        opt(report.rain.as_ref().and_then(|r| r.one_hour))
    ));

    html.push_str(&format!(
        "<div class=\"clouds\">Clouds: {}</div>\n",
        opt(report.clouds.as_ref().map(|c| c.all))
    ));

    html.push_str(&format!("<div class=\"dt\">Dt: {}</div>\n", unix_time(report.dt)));

    let sys = report.sys.clone().unwrap_or_default();
    html.push_str(&format!(
        "<div class=\"sys\">\nSys:<br>\nType {}<br>\nID {}<br>\nCountry {}<br>\nSunrise {}<br>\nSunset {}\n</div>\n",
        opt(sys.kind),
        opt(sys.id),
        opt(sys.country.as_deref()),
        unix_time(sys.sunrise),
        unix_time(sys.sunset),
    ));

    html.push_str(&format!(
        "<div class=\"timezone\">Timezone: {}</div>\n",
        opt(report.timezone)
    ));

    html.push_str(&format!("<div class=\"id\">ID: {}</div>\n", opt(report.id)));

    html
}
