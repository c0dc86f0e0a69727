use chrono::NaiveDate;
use finance_planner::*;

fn d(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn cafe_scenario() -> InvestmentScenario {
    InvestmentScenario {
        name: "Kadıköy Kafe".to_string(),
        investment_amount: 1_000_000.0,
        equity_share: 0.2,
        base_revenue: 2_000_000.0,
        base_expenses: 1_600_000.0,
        revenue_growth_rate: 0.2,
        expense_growth_rate: 0.1,
        fixed_cost_share: 0.5,
        discount_rate: 0.3,
        exit_revenue_multiple: 2.0,
        horizon_years: 3,
    }
}

#[test]
fn test_statement_import_to_quarterly_report() {
    let statement: ParsedStatement = serde_json::from_str(
        r#"{
            "bank_name": "Garanti BBVA",
            "rows": [
                {"date": "2024-01-05", "description": "MAAŞ ÖDEMESİ", "amount": 40000.0},
                {"date": "2024-02-10", "description": "MIGROS  KADIKOY", "amount": -2000.0},
                {"date": "2024-04-03", "description": "MAAŞ ÖDEMESİ", "amount": 44000.0},
                {"date": "2024-05-01", "description": "EV KİRASI", "amount": -15000.0},
                {"date": "2024-07-15", "description": "KK BORÇ ÖDEME", "amount": -5000.0, "is_transfer": true}
            ]
        }"#,
    )
    .unwrap();

    let imported = normalize_statement(&statement);
    assert_eq!(imported.len(), 5);

    // The same statement uploaded twice adds nothing new.
    let (again, skipped) = deduplicate(&imported, normalize_statement(&statement));
    assert!(again.is_empty());
    assert_eq!(skipped, 5);

    let categories = ["salary", "groceries", "salary", "rent", "transfer"];
    let mut transactions: Vec<Transaction> = imported
        .into_iter()
        .zip(categories)
        .map(|(tx, category)| tx.with_category(category))
        .collect();
    transactions.push(
        Transaction::new(d(2024, 10, 1), "Upwork payout", 1_000.0, TransactionKind::Income)
            .with_currency(Currency::Usd)
            .with_category("sales"),
    );

    let rates = ExchangeRates::new().with_rate(Currency::Usd, 32.0);
    let book = CategoryBook::turkish_defaults();
    let report = quarterly_report(&transactions, &book, 2024, &rates).unwrap();

    assert_eq!(report.summary.revenue, QuarterlySeries::new(40_000.0, 44_000.0, 0.0, 32_000.0));
    assert_eq!(report.summary.expenses, QuarterlySeries::new(2_000.0, 15_000.0, 0.0, 0.0));
    assert_eq!(report.summary.total_net, 99_000.0);
    assert!((report.summary.net_growth[0] - (29_000.0 - 38_000.0) / 38_000.0 * 100.0).abs() < 1e-9);
    assert_eq!(report.summary.net_growth[1], -100.0);
    // Growth from an empty quarter falls back to zero.
    assert_eq!(report.summary.net_growth[2], 0.0);

    assert!(!report.by_category.contains_key("transfer"));
    assert_eq!(report.by_category["sales"].get(Quarter::Q4), 32_000.0);

    assert_eq!(report.income_statement.revenue, 116_000.0);
    assert_eq!(report.income_statement.operating_expenses, 17_000.0);
    assert_eq!(report.income_statement.net_income, 99_000.0);

    println!(
        "2024 net result {} ({})",
        format_compact(report.summary.total_net),
        format_full_try(report.summary.total_net)
    );
}

#[test]
fn test_missing_exchange_rate_is_reported() {
    let tx = Transaction::new(d(2024, 3, 1), "Hotel", 200.0, TransactionKind::Expense)
        .with_currency(Currency::Eur);
    let result = quarterly_report(&[tx], &CategoryBook::turkish_defaults(), 2024, &ExchangeRates::new());
    assert!(matches!(result, Err(FinancePlannerError::MissingExchangeRate { .. })));
}

#[test]
fn test_investment_scenario_end_to_end() -> anyhow::Result<()> {
    let scenario = cafe_scenario();
    let roi = analyze(&scenario)?;

    assert_eq!(roi.investor_cash_flows.len(), 3);
    assert!(roi.investor_total_return > 0.0);
    assert!((roi.moic - roi.investor_total_return / scenario.investment_amount).abs() < 1e-9);
    assert!(roi.irr_percent > -100.0);

    let inputs = ValuationInputs::from_scenario(&scenario, 1.5, 6.0, 10.0, 0.03)?;
    let valuation = blend(&inputs, &ValuationWeights::default())?;
    let weight_sum: f64 = valuation.methods.iter().map(|m| m.effective_weight).sum();
    assert!((weight_sum - 1.0).abs() < 1e-9);
    assert!(valuation.low <= valuation.blended_value && valuation.blended_value <= valuation.high);

    let settings = SimulationSettings {
        trials: 500,
        seed: Some(42),
        ..SimulationSettings::default()
    };
    let first = simulate(&scenario, &settings)?;
    let second = simulate(&scenario, &settings)?;
    assert_eq!(first, second);
    assert!(first.p10_npv <= first.p50_npv && first.p50_npv <= first.p90_npv);
    assert!((0.0..=1.0).contains(&first.probability_positive_npv));
    Ok(())
}

#[test]
fn test_quarterly_distribution_properties() {
    assert_eq!(distribute_fair_units(10), [3, 3, 2, 2]);
    let fair = distribute_fair(1_000.01);
    assert_eq!(fair.0, [250.01, 250.0, 250.0, 250.0]);

    let even = distribute_even(1_000.0);
    assert_eq!(even.0, [250.0; 4]);

    let records = vec![
        QuarterlyRecord::new("Satış", QuarterlySeries::new(100.0, 200.0, 300.0, 400.0)),
        QuarterlyRecord::new("Hizmet", QuarterlySeries::new(10.0, 20.0, 30.0, 40.0)),
    ];
    assert_eq!(sum_records(&records).0, [110.0, 220.0, 330.0, 440.0]);
    assert_eq!(growth_percent(0.0, 500.0), 0.0);
}

#[test]
fn test_formatting_and_iso_weeks() {
    assert_eq!(format_compact(1000.0), "₺1.0K");
    assert_eq!(format_compact(1_000_000.0), "₺1.0M");
    assert_eq!(format_compact(-1500.0), "-₺1.5K");
    assert_eq!(format_full_try(150549.0), "₺150.549");

    assert_eq!(iso_week_data(d(2024, 1, 4)), IsoWeekData { week: 1, year: 2024 });
    assert_eq!(iso_week_data(d(2022, 1, 1)), IsoWeekData { week: 52, year: 2021 });
    assert_eq!(weeks_in_iso_year(2020), 53);
    assert_eq!(iso_week_data(d(2020, 12, 31)), IsoWeekData { week: 53, year: 2020 });
    assert_eq!(IsoWeekData::new(2020, 53).unwrap().next(), IsoWeekData { week: 1, year: 2021 });
    assert!(IsoWeekData::new(2021, 53).is_err());
}

#[test]
fn test_week_planning_and_retrospective() {
    let week = IsoWeekData::new(2024, 23).unwrap();
    let (monday, sunday) = week.bounds().unwrap();
    assert_eq!(monday, d(2024, 6, 3));
    assert_eq!(sunday, d(2024, 6, 9));

    let items = vec![
        PlanItem {
            priority: Priority::High,
            status: TaskStatus::Done,
            estimated_minutes: Some(60),
            ..PlanItem::new("a", "Bütçe gözden geçir", d(2024, 6, 3))
        },
        PlanItem::new("b", "Fatura öde", d(2024, 6, 4)),
        PlanItem {
            priority: Priority::Low,
            status: TaskStatus::Done,
            ..PlanItem::new("c", "Ekstreleri yükle", d(2024, 6, 5))
        },
        PlanItem::new("z", "Gelecek hafta", d(2024, 6, 12)),
    ];
    let entries = vec![ActualEntry {
        plan_item_id: Some("a".to_string()),
        date: d(2024, 6, 3),
        minutes: 75,
        note: None,
    }];

    let plan = week_plan(week, &items).unwrap();
    assert_eq!(plan.days.len(), 7);
    assert_eq!(plan.days[0].items[0].id, "a");
    assert!(plan.days.iter().all(|day| day.items.iter().all(|i| i.id != "z")));

    let retro = retrospective(week, &items, &entries).unwrap();
    assert_eq!(retro.total_planned, 3);
    assert_eq!(retro.total_completed, 2);
    assert!((retro.completion_rate - 200.0 / 3.0).abs() < 1e-9);
    assert_eq!(retro.high_priority_completion_rate, 100.0);
    assert_eq!(retro.estimate_accuracy_percent, Some(125.0));
    assert_eq!(retro.unfinished.len(), 1);
    assert_eq!(retro.unfinished[0].id, "b");

    let carried = carry_over(&retro.unfinished, d(2024, 6, 10));
    assert_eq!(carried[0].date, d(2024, 6, 10));
    assert_eq!(carried[0].carried_over_from, Some(d(2024, 6, 4)));
}

#[test]
fn test_balance_sheet_with_period_result() {
    let sheet = BalanceSheet::new(
        d(2024, 12, 31),
        vec![
            BalanceSheetLine {
                name: "Kasa ve Banka".to_string(),
                section: BalanceSheetSection::CurrentAsset,
                amount: 500_000.0,
            },
            BalanceSheetLine {
                name: "Demirbaşlar".to_string(),
                section: BalanceSheetSection::NonCurrentAsset,
                amount: 200_000.0,
            },
            BalanceSheetLine {
                name: "Satıcılar".to_string(),
                section: BalanceSheetSection::CurrentLiability,
                amount: 100_000.0,
            },
            BalanceSheetLine {
                name: "Banka Kredisi".to_string(),
                section: BalanceSheetSection::LongTermLiability,
                amount: 150_000.0,
            },
            BalanceSheetLine {
                name: "Sermaye".to_string(),
                section: BalanceSheetSection::Equity,
                amount: 350_000.0,
            },
        ],
    );

    assert!(sheet.verify(0.01).is_err());

    let closed = sheet.clone().with_period_result(100_000.0);
    closed.verify(0.01).unwrap();
    let totals = closed.totals();
    assert_eq!(totals.total_assets, 700_000.0);
    assert_eq!(totals.current_ratio, Some(5.0));

    let mut plugged = sheet;
    assert_eq!(plugged.balance_with_plug(), 100_000.0);
    plugged.verify(0.01).unwrap();
}
