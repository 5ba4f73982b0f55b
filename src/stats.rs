use crate::followup::{FollowUpBucket, StatusClass, classify_status};
use crate::models::{Budget, GroupTotals, StatsResponse};
use std::collections::BTreeMap;

pub fn build_stats(budgets: &[Budget]) -> StatsResponse {
    let mut total = GroupTotals::default();
    let mut por_status = BTreeMap::new();
    let mut por_vendedor = BTreeMap::new();
    let mut por_faixa: BTreeMap<String, GroupTotals> = FollowUpBucket::ALL
        .iter()
        .map(|bucket| (bucket.label().to_string(), GroupTotals::default()))
        .collect();
    let mut ganhos = GroupTotals::default();
    let mut perdidos = GroupTotals::default();
    let mut em_aberto = GroupTotals::default();
    let mut sem_follow_up = 0u64;

    for budget in budgets {
        add(&mut total, budget.valor);
        add(por_status.entry(budget.status.clone()).or_default(), budget.valor);
        add(por_vendedor.entry(seller_key(budget)).or_default(), budget.valor);
        add(por_faixa.entry(budget.faixa.clone()).or_default(), budget.valor);

        let class = match classify_status(&budget.status) {
            StatusClass::Won => &mut ganhos,
            StatusClass::Lost => &mut perdidos,
            StatusClass::Open => &mut em_aberto,
        };
        add(class, budget.valor);

        if budget.historico.is_empty() {
            sem_follow_up += 1;
        }
    }

    let closed = ganhos.quantidade + perdidos.quantidade;
    let taxa_conversao = if closed == 0 {
        0.0
    } else {
        ganhos.quantidade as f64 / closed as f64
    };
    let ticket_medio = if total.quantidade == 0 {
        0.0
    } else {
        total.valor / total.quantidade as f64
    };

    StatsResponse {
        total,
        por_status,
        por_vendedor,
        por_faixa,
        ganhos,
        perdidos,
        em_aberto,
        taxa_conversao,
        ticket_medio,
        sem_follow_up,
    }
}

fn add(totals: &mut GroupTotals, valor: f64) {
    totals.quantidade = totals.quantidade.saturating_add(1);
    totals.valor += valor;
}

fn seller_key(budget: &Budget) -> String {
    let name = budget.vendedor.trim();
    if !name.is_empty() {
        return name.to_string();
    }
    let code = budget.codigo_vendedor.trim();
    if code.is_empty() {
        "Sem vendedor".to_string()
    } else {
        code.to_string()
    }
}
