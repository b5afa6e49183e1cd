//! Dashboard rendering.
//!
//! The page embeds the full dataset as JSON and draws it with Chart.js. Output is a
//! pure function of the rows and title, so regenerating with unchanged data yields
//! an identical file.

use crate::model::Measurement;

const CHART_JS_CDN: &str = "https://cdn.jsdelivr.net/npm/chart.js@4.4.1/dist/chart.umd.min.js";

pub fn render_html(rows: &[Measurement], title: &str) -> anyhow::Result<String> {
    let data = embed_json(rows)?;
    let title = escape(title);

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <script src="{cdn}"></script>
    <style>{css}</style>
</head>
<body>
    <div class="container">
        <header>
            <h1>{title}</h1>
            {summary}
        </header>
        <nav class="ranges">
            <button type="button" data-range="all" class="active">All</button>
            <button type="button" data-range="day">24h</button>
            <button type="button" data-range="week">7d</button>
        </nav>
        <div class="chart-wrapper">
            <canvas id="speedChart"></canvas>
            <p id="emptyState" class="empty" hidden>No measurements in this range.</p>
        </div>
        <div class="footer">{footer}</div>
    </div>
    <script id="speed-data" type="application/json">{data}</script>
    <script>{js}</script>
</body>
</html>
"#,
        title = title,
        cdn = CHART_JS_CDN,
        css = INLINE_CSS,
        summary = render_summary(rows.last()),
        footer = render_footer(rows.last(), rows.len()),
        data = data,
        js = INLINE_JS,
    ))
}

/// Serialized dataset, safe to place inside a `<script>` element.
pub fn embed_json(rows: &[Measurement]) -> anyhow::Result<String> {
    let json = serde_json::to_string(rows)?;
    // '<' can only occur inside JSON strings, where < is equivalent.
    Ok(json.replace('<', "\\u003c"))
}

fn render_summary(latest: Option<&Measurement>) -> String {
    let Some(m) = latest else {
        return r#"<div class="stats-summary" id="currentStats"></div>"#.to_string();
    };
    let sinr5g = m
        .sinr5g
        .map(|v| format!("{} dB", v))
        .unwrap_or_else(|| "N/A".to_string());

    let items = [
        ("Latest Download", format!("{} Mbps", m.download), "download"),
        ("Latest Upload", format!("{} Mbps", m.upload), "upload"),
        ("Ping", format!("{} ms", m.ping), "latency"),
        ("Jitter", format!("{} ms", m.jitter), "latency"),
        ("Latest 5G SINR", sinr5g, "sinr"),
    ];

    let mut html = String::from(r#"<div class="stats-summary" id="currentStats">"#);
    for (label, value, class) in items {
        html.push_str(&format!(
            r#"
                <div class="stat-item">
                    <span class="stat-label">{}</span>
                    <span class="stat-value {}">{}</span>
                </div>"#,
            label,
            class,
            escape(&value)
        ));
    }
    html.push_str("\n            </div>");
    html
}

fn render_footer(latest: Option<&Measurement>, rows: usize) -> String {
    match latest {
        Some(m) => format!(
            "Last updated: {} &middot; {} measurements",
            m.timestamp.format("%Y-%m-%d %H:%M UTC"),
            rows
        ),
        None => "No measurements yet.".to_string(),
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const INLINE_CSS: &str = r#"
        :root {
            --bg-color: #0f172a;
            --card-bg: #1e293b;
            --text-main: #f8fafc;
            --text-dim: #94a3b8;
            --download-color: #38bdf8;
            --upload-color: #fbbf24;
            --sinr-color: #4ade80;
        }
        body {
            font-family: 'Inter', system-ui, -apple-system, sans-serif;
            background-color: var(--bg-color);
            color: var(--text-main);
            margin: 0;
            display: flex;
            justify-content: center;
            align-items: center;
            height: 100vh;
            overflow: hidden;
        }
        .container {
            width: 95%;
            max-width: 1800px;
            height: calc(100vh - 4rem);
            background: var(--card-bg);
            padding: 2rem;
            border-radius: 1.5rem;
            box-shadow: 0 25px 50px -12px rgba(0, 0, 0, 0.5);
            margin: 2rem;
            display: flex;
            flex-direction: column;
            box-sizing: border-box;
        }
        header {
            display: flex;
            justify-content: space-between;
            align-items: center;
            margin-bottom: 1rem;
            border-bottom: 1px solid rgba(255, 255, 255, 0.05);
            padding-bottom: 1rem;
            flex-shrink: 0;
        }
        h1 { margin: 0; font-weight: 300; font-size: 1.6rem; }
        .stats-summary { display: flex; gap: 1.5rem; }
        .stat-item { display: flex; flex-direction: column; align-items: flex-end; }
        .stat-label { font-size: 0.7rem; text-transform: uppercase; color: var(--text-dim); }
        .stat-value { font-size: 1.1rem; font-weight: 600; }
        .stat-value.download { color: var(--download-color); }
        .stat-value.upload { color: var(--upload-color); }
        .stat-value.sinr { color: var(--sinr-color); }
        .ranges { display: flex; gap: 0.5rem; margin-bottom: 1rem; flex-shrink: 0; }
        .ranges button {
            background: transparent;
            color: var(--text-dim);
            border: 1px solid rgba(255, 255, 255, 0.1);
            border-radius: 0.5rem;
            padding: 0.25rem 0.75rem;
            cursor: pointer;
        }
        .ranges button.active { color: var(--text-main); border-color: var(--download-color); }
        .chart-wrapper { position: relative; flex: 1; min-height: 0; width: 100%; }
        .empty { position: absolute; inset: 0; display: flex; align-items: center; justify-content: center; color: var(--text-dim); margin: 0; }
        .empty[hidden] { display: none; }
        .footer { margin-top: 1rem; text-align: center; color: var(--text-dim); font-size: 0.8rem; flex-shrink: 0; }
"#;

const INLINE_JS: &str = r#"
(function () {
    const speedData = JSON.parse(document.getElementById('speed-data').textContent || '[]');
    const RANGES = { all: null, day: 24 * 3600 * 1000, week: 7 * 24 * 3600 * 1000 };
    let chart = null;

    function select(range) {
        const span = RANGES[range];
        if (!span) return speedData;
        const cutoff = Date.now() - span;
        return speedData.filter(d => Date.parse(d.timestamp) >= cutoff);
    }

    function label(d) {
        return new Date(d.timestamp).toLocaleString([], {
            month: 'short', day: 'numeric', hour: '2-digit', minute: '2-digit'
        });
    }

    function config(rows) {
        return {
            type: 'line',
            data: {
                labels: rows.map(label),
                datasets: [
                    { label: 'Download Speed', data: rows.map(d => d.download), borderColor: '#38bdf8',
                      backgroundColor: 'rgba(56, 189, 248, 0.1)', fill: true, tension: 0, borderWidth: 1.5, yAxisID: 'y' },
                    { label: 'Upload Speed', data: rows.map(d => d.upload), borderColor: '#fbbf24',
                      backgroundColor: 'rgba(251, 191, 36, 0.1)', fill: true, tension: 0, borderWidth: 1.5, yAxisID: 'y1' },
                    { label: '4G SINR', data: rows.map(d => d.sinr4g), borderColor: '#4ade80', borderDash: [5, 5],
                      fill: false, tension: 0, borderWidth: 1.5, yAxisID: 'y2', spanGaps: false },
                    { label: '5G SINR', data: rows.map(d => d.sinr5g), borderColor: '#22c55e',
                      fill: false, tension: 0, borderWidth: 1.5, yAxisID: 'y2', spanGaps: false }
                ]
            },
            options: {
                responsive: true,
                maintainAspectRatio: false,
                interaction: { mode: 'index', intersect: false },
                plugins: {
                    legend: { labels: { color: '#f8fafc' } },
                    tooltip: {
                        backgroundColor: '#1e293b',
                        titleColor: '#94a3b8',
                        bodyColor: '#f8fafc',
                        borderColor: 'rgba(255,255,255,0.1)',
                        borderWidth: 1,
                        padding: 12,
                        callbacks: {
                            label: function (context) {
                                let text = context.dataset.label || '';
                                if (text) text += ': ';
                                if (context.parsed.y !== null) {
                                    text += context.parsed.y + (text.includes('SINR') ? ' dB' : ' Mbps');
                                } else {
                                    text += 'N/A';
                                }
                                return text;
                            },
                            title: function (context) {
                                return new Date(rows[context[0].dataIndex].timestamp).toLocaleString();
                            },
                            afterBody: function (context) {
                                const item = rows[context[0].dataIndex];
                                return ['Ping: ' + item.ping + ' ms', 'Jitter: ' + item.jitter + ' ms'];
                            }
                        }
                    }
                },
                scales: {
                    x: { grid: { display: false }, ticks: { color: '#64748b', autoSkip: true, maxTicksLimit: 10 } },
                    y: { min: 0, position: 'left', title: { display: true, text: 'Download (Mbps)', color: '#38bdf8' }, ticks: { color: '#64748b' } },
                    y1: { min: 0, position: 'right', grid: { drawOnChartArea: false }, title: { display: true, text: 'Upload (Mbps)', color: '#fbbf24' }, ticks: { color: '#64748b' } },
                    y2: { min: -10, max: 40, position: 'right', grid: { drawOnChartArea: false }, title: { display: true, text: 'SINR (dB)', color: '#4ade80' }, ticks: { color: '#64748b' } }
                }
            }
        };
    }

    function render(range) {
        document.querySelectorAll('.ranges button').forEach(b => {
            b.classList.toggle('active', b.dataset.range === range);
        });
        if (chart) {
            chart.destroy();
            chart = null;
        }
        const rows = select(range);
        const empty = document.getElementById('emptyState');
        if (rows.length === 0 || typeof Chart === 'undefined') {
            empty.hidden = false;
            return;
        }
        empty.hidden = true;
        chart = new Chart(document.getElementById('speedChart').getContext('2d'), config(rows));
    }

    document.querySelectorAll('.ranges button').forEach(b => {
        b.addEventListener('click', () => render(b.dataset.range));
    });
    render('all');
})();
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::parse_timestamp;

    fn row(ts: &str, sinr5g: Option<f64>) -> Measurement {
        Measurement {
            timestamp: parse_timestamp(ts).unwrap(),
            download: 150.2,
            upload: 12.4,
            ping: 18.0,
            jitter: 2.1,
            sinr4g: None,
            sinr5g,
        }
    }

    #[test]
    fn summary_uses_latest_row() {
        let rows = vec![
            row("2024-01-01T00:00:00Z", None),
            Measurement {
                download: 300.5,
                ..row("2024-01-02T08:30:00Z", Some(13.0))
            },
        ];
        let doc = render_html(&rows, "Link").unwrap();
        assert!(doc.contains("300.5 Mbps"));
        assert!(doc.contains("13 dB"));
        assert!(doc.contains("Last updated: 2024-01-02 08:30 UTC"));
        assert!(doc.contains("2 measurements"));
    }

    #[test]
    fn missing_sinr_is_shown_as_na() {
        let doc = render_html(&[row("2024-01-01T00:00:00Z", None)], "Link").unwrap();
        assert!(doc.contains(">N/A<"));
    }

    #[test]
    fn empty_dataset_renders_a_page_without_summary() {
        let doc = render_html(&[], "Link").unwrap();
        assert!(doc.contains(r#"<script id="speed-data" type="application/json">[]</script>"#));
        assert!(doc.contains("No measurements yet."));
        assert!(!doc.contains("Latest Download"));
    }

    #[test]
    fn title_is_escaped() {
        let doc = render_html(&[], "<Home & Office>").unwrap();
        assert!(doc.contains("<title>&lt;Home &amp; Office&gt;</title>"));
    }

    #[test]
    fn embedded_json_never_closes_the_script_element() {
        let json = embed_json(&[row("2024-01-01T00:00:00Z", None)]).unwrap();
        assert!(!json.contains('<'));
        let back: Vec<Measurement> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 1);
    }
}
