use tabled::Tabled;

#[derive(Tabled)]
pub struct SummaryRow {
    pub name: String,
    pub unit: String,
    pub samples: usize,
    #[tabled(display = "float2")]
    pub mean: f64,
    #[tabled(display = "float2")]
    pub min: f64,
    #[tabled(display = "float2")]
    pub max: f64,
}

fn float2(n: &f64) -> String {
    format!("{:.2}", n)
}
