use unicode_width::UnicodeWidthStr;

/// Renders the ranking as horizontal bars, the longest one being `width`
/// characters long.
pub fn render_bar_chart(ranking: &[(String, u64)], width: usize) -> String {
    let label_width = ranking
        .iter()
        .map(|(o, _)| o.width())
        .max()
        .unwrap_or(0);
    let max_total = ranking.iter().map(|(_, t)| *t).max().unwrap_or(0);
    let mut res = String::new();
    for (option, total) in ranking {
        let bar_len = if max_total == 0 {
            0
        } else {
            ((*total as u128 * width as u128 + max_total as u128 / 2) / max_total as u128) as usize
        };
        // Non-zero totals always get a visible bar.
        let bar_len = if *total > 0 { bar_len.max(1) } else { 0 };
        // Wide characters take two columns.
        let padding = label_width - option.width();
        res.push_str(&format!(
            "{}{} | {} {}\n",
            option,
            " ".repeat(padding),
            "#".repeat(bar_len),
            total
        ));
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_bars() {
        let ranking = vec![
            ("温泉".to_string(), 8),
            ("BBQ".to_string(), 2),
            ("ハイキング".to_string(), 0),
        ];
        let chart = render_bar_chart(&ranking, 8);
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines[0], "温泉       | ######## 8");
        assert_eq!(lines[1], "BBQ        | ## 2");
        assert_eq!(lines[2], "ハイキング |  0");
        // The bars start on the same column.
        let bar_columns: Vec<usize> = lines
            .iter()
            .map(|l| l.split(" | ").next().unwrap().width())
            .collect();
        assert_eq!(bar_columns, vec![10, 10, 10]);
    }

    #[test]
    fn empty_ranking() {
        assert_eq!(render_bar_chart(&[], 10), "");
    }
}
