pub fn render_index() -> &'static str {
    INDEX_HTML
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Follow-up Crystal</title>
  <style>
    :root {
      --bg: #f4f6f8;
      --ink: #1f2a33;
      --muted: #5f6b75;
      --accent: #2f6f9f;
      --danger: #b23b3b;
      --card: #ffffff;
      --shadow: 0 12px 32px rgba(31, 42, 51, 0.12);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      background: var(--bg);
      color: var(--ink);
      font-family: "Segoe UI", "Trebuchet MS", sans-serif;
      padding: 24px 18px 48px;
    }

    .app {
      width: min(1180px, 100%);
      margin: 0 auto;
      display: grid;
      gap: 20px;
    }

    h1 {
      margin: 0;
      font-size: clamp(1.6rem, 3vw, 2.2rem);
    }

    .card {
      background: var(--card);
      border-radius: 16px;
      box-shadow: var(--shadow);
      padding: 20px;
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(170px, 1fr));
      gap: 14px;
    }

    .stat .label {
      color: var(--muted);
      font-size: 0.85rem;
    }

    .stat .value {
      font-size: 1.5rem;
      font-weight: 600;
    }

    .filters {
      display: flex;
      flex-wrap: wrap;
      gap: 10px;
    }

    input, select, textarea, button {
      font: inherit;
      padding: 8px 10px;
      border-radius: 8px;
      border: 1px solid #cfd6dc;
    }

    button {
      background: var(--accent);
      color: #fff;
      border: none;
      cursor: pointer;
    }

    table {
      width: 100%;
      border-collapse: collapse;
      font-size: 0.92rem;
    }

    th, td {
      text-align: left;
      padding: 8px;
      border-bottom: 1px solid #e3e8ec;
    }

    tr.selected {
      background: #e8f1f8;
    }

    .status {
      min-height: 1.2em;
      color: var(--danger);
    }

    .columns {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(320px, 1fr));
      gap: 20px;
    }

    #chat-log {
      white-space: pre-wrap;
      max-height: 320px;
      overflow-y: auto;
      font-size: 0.92rem;
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>Follow-up Crystal</h1>
      <p id="user-line"></p>
    </header>

    <section class="card panel" id="stats">
      <div class="stat"><div class="label">Orçamentos</div><div class="value" id="stat-total">-</div></div>
      <div class="stat"><div class="label">Valor total</div><div class="value" id="stat-valor">-</div></div>
      <div class="stat"><div class="label">Em aberto</div><div class="value" id="stat-aberto">-</div></div>
      <div class="stat"><div class="label">Conversão</div><div class="value" id="stat-conversao">-</div></div>
      <div class="stat"><div class="label">Sem follow-up</div><div class="value" id="stat-sem">-</div></div>
    </section>

    <section class="card">
      <form class="filters" id="filters">
        <select name="vendedor" id="filter-vendedor"><option value="">Todos os vendedores</option></select>
        <input name="status" placeholder="Status" />
        <select name="faixa">
          <option value="">Todas as faixas</option>
          <option>0-7 dias</option>
          <option>8-15 dias</option>
          <option>16-30 dias</option>
          <option>31-60 dias</option>
          <option>60+ dias</option>
        </select>
        <input name="cliente" placeholder="Cliente" />
        <button type="submit">Filtrar</button>
      </form>
      <div class="status" id="status"></div>
      <table>
        <thead>
          <tr><th>Seq.</th><th>Data</th><th>Cliente</th><th>Valor</th><th>Vendedor</th><th>Status</th><th>Dias</th><th>Último follow-up</th></tr>
        </thead>
        <tbody id="budgets"></tbody>
      </table>
    </section>

    <section class="columns">
      <div class="card">
        <h2 id="detail-title">Selecione um orçamento</h2>
        <ul id="history"></ul>
        <form id="follow-up" hidden>
          <input name="status" placeholder="Novo status" required />
          <textarea name="observacoes" rows="3" placeholder="Observações"></textarea>
          <button type="submit">Registrar follow-up</button>
        </form>
      </div>

      <div class="card">
        <h2>Assistente</h2>
        <div id="chat-log"></div>
        <form id="chat">
          <input name="message" placeholder="Pergunte sobre a carteira" />
          <button type="submit">Enviar</button>
          <button type="button" id="analysis">Gerar análise</button>
        </form>
      </div>
    </section>
  </main>

  <script>
    const money = new Intl.NumberFormat('pt-BR', { style: 'currency', currency: 'BRL' });
    const statusEl = document.getElementById('status');
    let selected = null;

    function showError(err) {
      statusEl.textContent = err.message || String(err);
    }

    async function api(path, options) {
      const res = await fetch(path, options);
      const body = await res.json().catch(() => ({}));
      if (!res.ok) {
        throw new Error(body.error || 'Erro inesperado');
      }
      return body;
    }

    function filterQuery() {
      const params = new URLSearchParams(new FormData(document.getElementById('filters')));
      for (const [key, value] of [...params]) {
        if (!value) params.delete(key);
      }
      return params.toString();
    }

    async function loadStats() {
      const stats = await api('/api/stats?' + filterQuery());
      document.getElementById('stat-total').textContent = stats.total.quantidade;
      document.getElementById('stat-valor').textContent = money.format(stats.total.valor);
      document.getElementById('stat-aberto').textContent = stats.em_aberto.quantidade;
      document.getElementById('stat-conversao').textContent = (stats.taxa_conversao * 100).toFixed(1) + '%';
      document.getElementById('stat-sem').textContent = stats.sem_follow_up;
    }

    async function loadBudgets() {
      const budgets = await api('/api/budgets?' + filterQuery());
      const body = document.getElementById('budgets');
      body.replaceChildren();
      for (const budget of budgets) {
        const row = document.createElement('tr');
        const cells = [
          budget.sequencia,
          budget.data,
          budget.cliente,
          money.format(budget.valor),
          budget.vendedor,
          budget.status,
          budget.dias_em_aberto,
          budget.ultimo_follow_up || '-',
        ];
        for (const value of cells) {
          const cell = document.createElement('td');
          cell.textContent = value;
          row.appendChild(cell);
        }
        row.addEventListener('click', () => selectBudget(budget, row));
        body.appendChild(row);
      }
    }

    function selectBudget(budget, row) {
      selected = budget.sequencia;
      document.querySelectorAll('tr.selected').forEach((el) => el.classList.remove('selected'));
      row.classList.add('selected');
      document.getElementById('detail-title').textContent = '#' + budget.sequencia + ' ' + budget.cliente;
      const list = document.getElementById('history');
      list.replaceChildren();
      for (const item of budget.historico) {
        const li = document.createElement('li');
        li.textContent = item.data_hora + ' - ' + item.status + (item.observacoes ? ': ' + item.observacoes : '');
        list.appendChild(li);
      }
      document.getElementById('follow-up').hidden = false;
    }

    async function loadVendedores() {
      const vendedores = await api('/api/vendedores');
      const select = document.getElementById('filter-vendedor');
      for (const vendedor of vendedores) {
        const option = document.createElement('option');
        option.value = vendedor.codigo;
        option.textContent = vendedor.nome || vendedor.codigo;
        select.appendChild(option);
      }
    }

    async function loadUser() {
      const settings = await api('/api/settings');
      const line = document.getElementById('user-line');
      line.textContent = settings.usuario ? 'Vendedor: ' + settings.usuario.nome : '';
    }

    async function refresh() {
      statusEl.textContent = '';
      try {
        await Promise.all([loadStats(), loadBudgets()]);
      } catch (err) {
        showError(err);
      }
    }

    function appendChat(who, text) {
      const log = document.getElementById('chat-log');
      log.textContent += who + ': ' + text + '\n\n';
      log.scrollTop = log.scrollHeight;
    }

    document.getElementById('filters').addEventListener('submit', (event) => {
      event.preventDefault();
      refresh();
    });

    document.getElementById('follow-up').addEventListener('submit', async (event) => {
      event.preventDefault();
      if (!selected) return;
      const form = event.target;
      try {
        await api('/api/budgets/' + encodeURIComponent(selected) + '/follow-up', {
          method: 'POST',
          headers: { 'Content-Type': 'application/json' },
          body: JSON.stringify({
            status: form.status.value,
            observacoes: form.observacoes.value,
          }),
        });
        form.reset();
        await refresh();
      } catch (err) {
        showError(err);
      }
    });

    document.getElementById('chat').addEventListener('submit', async (event) => {
      event.preventDefault();
      const input = event.target.message;
      const message = input.value.trim();
      if (!message) return;
      appendChat('Você', message);
      input.value = '';
      try {
        const reply = await api('/api/chat', {
          method: 'POST',
          headers: { 'Content-Type': 'application/json' },
          body: JSON.stringify({ message }),
        });
        appendChat('Assistente', reply.content);
      } catch (err) {
        showError(err);
      }
    });

    document.getElementById('analysis').addEventListener('click', async () => {
      const vendedor = document.getElementById('filter-vendedor').value || null;
      try {
        const reply = await api('/api/analysis', {
          method: 'POST',
          headers: { 'Content-Type': 'application/json' },
          body: JSON.stringify({ vendedor }),
        });
        appendChat('Análise', reply.content);
      } catch (err) {
        showError(err);
      }
    });

    loadUser().catch(showError);
    loadVendedores().catch(showError);
    refresh();
  </script>
</body>
</html>
"#;
