use serde::Serialize;

use crate::models::MealAnalysis;

/// Labeled metric strings shown for one analysed meal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealMetrics {
    pub calories: String,
    pub protein: String,
    pub carbs: String,
    pub fat: String,
    pub vitamin_c: String,
    pub vitamin_d: String,
    pub iron: String,
}

impl From<&MealAnalysis> for MealMetrics {
    fn from(meal: &MealAnalysis) -> Self {
        Self {
            calories: format!("{} kcal", meal.calories),
            protein: format!("{} g", meal.nutrients.protein),
            carbs: format!("{} g", meal.nutrients.carbs),
            fat: format!("{} g", meal.nutrients.fat),
            vitamin_c: format!("{} mg", meal.vitamins.vitamin_c),
            vitamin_d: format!("{} mcg", meal.vitamins.vitamin_d),
            iron: format!("{} mg", meal.vitamins.iron),
        }
    }
}

/// "1. Apple: 95 kcal"
pub fn meal_list_line(position: usize, meal: &MealAnalysis) -> String {
    format!("{}. {}: {} kcal", position, meal.food_name, meal.calories)
}

/// Minimal markdown to HTML for the daily report: line breaks, `##`/`###`
/// headings and bold markers. Model text is escaped first.
pub fn markdown_to_html(text: &str) -> String {
    let mut html = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            html.push_str("<br>");
        }
        let line = escape_html(line);
        let line = if let Some(rest) = line.strip_prefix("### ") {
            format!("<h3>{}</h3>", rest)
        } else if let Some(rest) = line.strip_prefix("## ") {
            format!("<h2>{}</h2>", rest)
        } else {
            line.to_string()
        };
        html.push_str(&bold(&line));
    }
    html
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn bold(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for (i, chunk) in line.split("**").enumerate() {
        if i > 0 {
            out.push_str(if i % 2 == 1 { "<b>" } else { "</b>" });
        }
        out.push_str(chunk);
    }
    out
}
