use serde::{Deserialize, Serialize};

use crate::models::fundamentals::{
    AnnualFundamentals, CompetitorMetrics, CompetitorScorecard, DelinquencyRate, LatePaymentRate,
    LatePaymentTrendPoint, MarketSizePoint, QuarterlyFundamentals, ScorecardMetric, ValuationEvent,
};
use crate::models::symbol::Symbol;

/// Reference tables shipped with the dashboard. Independent of live prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticDataset {
    pub annual: Vec<AnnualFundamentals>,
    pub quarterly: Vec<QuarterlyFundamentals>,
    pub valuations: Vec<ValuationEvent>,
    pub delinquency: Vec<DelinquencyRate>,
    pub late_payments: Vec<LatePaymentRate>,
    pub late_payment_trend: Vec<LatePaymentTrendPoint>,
    pub market_size: Vec<MarketSizePoint>,
    pub competitors: Vec<CompetitorMetrics>,
    pub scorecard: CompetitorScorecard,
}

impl StaticDataset {
    /// Klarna fundamentals and BNPL sector figures as of early 2026.
    pub fn bundled() -> Self {
        StaticDataset {
            annual: annual(),
            quarterly: quarterly(),
            valuations: valuations(),
            delinquency: delinquency(),
            late_payments: late_payments(),
            late_payment_trend: late_payment_trend(),
            market_size: market_size(),
            competitors: competitors(),
            scorecard: scorecard(),
        }
    }

    pub fn annual_for(&self, year: i32) -> Option<&AnnualFundamentals> {
        self.annual.iter().find(|a| a.year == year)
    }

    /// `(year, growth %)` for every year with a prior row.
    pub fn revenue_growth(&self) -> Vec<(i32, f64)> {
        self.annual
            .windows(2)
            .map(|w| (w[1].year, w[1].revenue_growth_pct(&w[0])))
            .collect()
    }
}

fn annual() -> Vec<AnnualFundamentals> {
    let revenue = [602.0, 845.0, 1204.0, 1850.0, 2277.0, 2810.0, 3500.0];
    let net_income = [-93.0, -153.0, -688.0, -1047.0, -241.0, 55.0, -200.0];
    let gmv = [35.0, 53.0, 80.0, 100.0, 90.0, 105.0, 130.0];
    let users = [70.0, 87.0, 90.0, 97.0, 100.0, 108.0, 114.0];
    let merchants = [190.0, 250.0, 400.0, 500.0, 550.0, 616.0, 850.0];
    let headcount = [3500, 4000, 6500, 7000, 5200, 4300, 3800];

    (0..revenue.len())
        .map(|i| AnnualFundamentals {
            year: 2019 + i as i32,
            revenue_m: revenue[i],
            net_income_m: net_income[i],
            gmv_b: gmv[i],
            active_users_m: users[i],
            merchants_k: merchants[i],
            headcount: headcount[i],
        })
        .collect()
}

fn quarterly() -> Vec<QuarterlyFundamentals> {
    let quarters = ["Q1 2024", "Q2 2024", "Q3 2024", "Q4 2024", "Q1 2025", "Q2 2025", "Q3 2025"];
    let revenue = [614.0, 706.0, 706.0, 784.0, 701.0, 823.0, 903.0];
    let net_income = [8.0, 12.0, 12.0, 30.0, -60.0, -57.0, -95.0];
    let gmv = [22.0, 24.5, 26.2, 31.0, 27.0, 29.5, 32.7];
    let users = [100.0, 102.0, 105.0, 108.0, 109.0, 111.0, 114.0];
    let merchants = [500.0, 550.0, 616.0, 680.0, 720.0, 800.0, 850.0];

    quarters
        .iter()
        .enumerate()
        .map(|(i, q)| QuarterlyFundamentals {
            quarter: q.to_string(),
            revenue_m: revenue[i],
            net_income_m: net_income[i],
            gmv_b: gmv[i],
            users_m: users[i],
            merchants_k: merchants[i],
        })
        .collect()
}

fn valuations() -> Vec<ValuationEvent> {
    [
        ("Series D", "Feb 2019", 5.5, None),
        ("Series E", "Sep 2020", 10.6, None),
        ("Peak", "Jun 2021", 45.6, None),
        ("Down-round", "Jul 2022", 6.7, None),
        ("Private", "Jul 2023", 9.0, None),
        ("Pre-IPO", "Jun 2024", 14.0, None),
        ("IPO Day 1", "Sep 10 2025", 17.0, Some(45.82)),
        ("ATH", "Dec 4 2025", 19.7, Some(57.20)),
        ("Current", "Feb 11 2026", 7.82, Some(19.75)),
    ]
    .into_iter()
    .map(|(event, date, valuation_b, price)| ValuationEvent {
        event: event.to_string(),
        date: date.to_string(),
        valuation_b,
        price,
    })
    .collect()
}

fn delinquency() -> Vec<DelinquencyRate> {
    [
        ("BNPL official default", 1.83, "CFPB Dec 2025"),
        ("BNPL self-reported late", 41.0, "LendingTree 2025"),
        ("Overall consumer debt", 3.5, "NY Fed Q1 2025"),
        ("Credit cards", 8.8, "NY Fed Q1 2025"),
        ("Auto loans", 4.2, "NY Fed Q1 2025"),
        ("Student loans 90+", 7.7, "NY Fed Q1 2025"),
        ("Klarna charge-off", 0.54, "Klarna Q2 2025"),
    ]
    .into_iter()
    .map(|(category, rate_pct, source)| DelinquencyRate {
        category: category.to_string(),
        rate_pct,
        source: source.to_string(),
    })
    .collect()
}

fn late_payments() -> Vec<LatePaymentRate> {
    [
        ("Gen Z (18-26)", 44.0, 51.0),
        ("Millennials (27-42)", 34.0, 38.0),
        ("Gen X (43-58)", 8.0, 10.0),
        ("Boomers (59+)", 4.0, 5.0),
    ]
    .into_iter()
    .map(|(demographic, rate_2024_pct, rate_2025_pct)| LatePaymentRate {
        demographic: demographic.to_string(),
        rate_2024_pct,
        rate_2025_pct,
    })
    .collect()
}

fn late_payment_trend() -> Vec<LatePaymentTrendPoint> {
    [(2021, 22.0), (2022, 26.0), (2023, 30.0), (2024, 34.0), (2025, 41.0)]
        .into_iter()
        .map(|(year, late_pct)| LatePaymentTrendPoint { year, late_pct })
        .collect()
}

fn market_size() -> Vec<MarketSizePoint> {
    let global = [35.0, 90.0, 186.0, 310.0, 420.0, 492.0, 560.0, 625.0, 695.0, 770.0];
    let us = [6.0, 20.0, 38.0, 60.0, 82.0, 103.0, 116.7, 130.0, 145.0, 163.8];

    global
        .iter()
        .zip(us)
        .enumerate()
        .map(|(i, (&global_b, us_b))| {
            let year = 2019 + i as i32;
            MarketSizePoint {
                year,
                global_b,
                us_b,
                // 2025 onward are forecasts
                projected: year >= 2025,
            }
        })
        .collect()
}

fn competitors() -> Vec<CompetitorMetrics> {
    [
        ("Klarna", "KLAR", 114.0, 26.0, 7.82, 2.24, false, -51.0),
        ("Affirm", "AFRM", 21.0, 36.0, 15.0, 5.66, false, 12.0),
        ("PayPal", "PYPL", 400.0, 5.0, 72.0, 2.32, true, -18.0),
        ("Block/Afterpay", "SQ", 20.0, 8.0, 38.0, 1.73, false, -8.0),
    ]
    .into_iter()
    .map(
        |(company, ticker, users_m, growth, cap, ps, profitable, since_ipo)| CompetitorMetrics {
            company: company.to_string(),
            ticker: ticker.to_string(),
            users_m,
            revenue_growth_pct: growth,
            market_cap_b: cap,
            price_to_sales: ps,
            profitable,
            return_since_ipo_pct: since_ipo,
        },
    )
    .collect()
}

fn scorecard() -> CompetitorScorecard {
    // Scores per ticker in KLAR, AFRM, PYPL, SQ order
    let rows: [(&str, [u8; 4]); 8] = [
        ("Revenue Growth", [5, 5, 2, 2]),
        ("P/S (lower=better)", [4, 3, 5, 3]),
        ("Profitability", [1, 3, 5, 2]),
        ("User Scale", [5, 3, 5, 3]),
        ("Stock Perf", [1, 4, 2, 3]),
        ("Reg. Risk", [2, 3, 4, 3]),
        ("AI Invest", [5, 3, 3, 3]),
        ("Credit Quality", [3, 4, 5, 3]),
    ];

    CompetitorScorecard {
        tickers: ["KLAR", "AFRM", "PYPL", "SQ"].into_iter().map(Symbol::new).collect(),
        metrics: rows
            .into_iter()
            .map(|(metric, scores)| ScorecardMetric {
                metric: metric.to_string(),
                scores: scores.to_vec(),
            })
            .collect(),
    }
}
