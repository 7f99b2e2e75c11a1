//! Registry integration tests: initialization order, identifier validity,
//! binding rounds and API lookup

use std::sync::{Arc, Mutex};

use fwk_core::{FwkError, FwkId, FwkResult};
use fwk_module::{
    ApiRef, BindPort, ElementDesc, ElementTable, Module, ModuleConfig, ModuleEntry, ModuleKind,
    ModuleState, Registry, BIND_ROUND_MAX,
};

type Trace = Arc<Mutex<Vec<String>>>;

static MODULE_CFG: u32 = 99;
static E0_CFG: u32 = 10;
static E1_CFG: u32 = 11;
static E2_CFG: u32 = 12;

static ELEMENTS: [ElementDesc; 3] = [
    ElementDesc { name: "e0", sub_element_count: 2, data: Some(&E0_CFG) },
    ElementDesc { name: "e1", sub_element_count: 0, data: Some(&E1_CFG) },
    ElementDesc { name: "e2", sub_element_count: 0, data: Some(&E2_CFG) },
];

/// Records the lifecycle callbacks it receives
struct Lifecycle {
    trace: Trace,
}

impl Lifecycle {
    fn entry(trace: &Trace, config: ModuleConfig) -> ModuleEntry {
        let module = Box::leak(Box::new(Lifecycle { trace: trace.clone() }));
        ModuleEntry::new(module, config)
    }
}

impl Module for Lifecycle {
    fn name(&self) -> &'static str {
        "lifecycle"
    }

    fn kind(&self) -> ModuleKind {
        ModuleKind::Driver
    }

    fn init(&mut self, id: FwkId, element_count: usize, data: Option<fwk_module::ConfigData>) -> FwkResult<()> {
        let value = data.and_then(|d| d.downcast_ref::<u32>()).copied();
        self.trace
            .lock()
            .unwrap()
            .push(format!("init {} elements={} data={:?}", id, element_count, value));
        Ok(())
    }

    fn element_init(
        &mut self,
        element_id: FwkId,
        sub_element_count: usize,
        data: Option<fwk_module::ConfigData>,
    ) -> FwkResult<()> {
        let value = data.and_then(|d| d.downcast_ref::<u32>()).copied();
        self.trace
            .lock()
            .unwrap()
            .push(format!("element_init {} subs={} data={:?}", element_id, sub_element_count, value));
        Ok(())
    }

    fn post_init(&mut self, id: FwkId) -> FwkResult<()> {
        self.trace.lock().unwrap().push(format!("post_init {}", id));
        Ok(())
    }

    fn bind(&mut self, id: FwkId, round: u32, _fwk: &mut dyn BindPort) -> FwkResult<()> {
        self.trace.lock().unwrap().push(format!("bind {} round={}", id, round));
        Ok(())
    }
}

/// Concrete API table handed out by the provider
struct MathApi;

impl MathApi {
    fn add(&self, a: u32, b: u32) -> u32 {
        a + b
    }
}

static MATH_API: MathApi = MathApi;

/// Grants its API only once its own bind callback has run, forcing
/// requesters declared earlier to retry in the next round.
struct Provider {
    ready: bool,
}

impl Provider {
    fn entry() -> ModuleEntry {
        let module = Box::leak(Box::new(Provider { ready: false }));
        ModuleEntry::new(module, ModuleConfig::new())
    }
}

impl Module for Provider {
    fn name(&self) -> &'static str {
        "provider"
    }

    fn kind(&self) -> ModuleKind {
        ModuleKind::Service
    }

    fn api_count(&self) -> usize {
        1
    }

    fn init(&mut self, _id: FwkId, _element_count: usize, _data: Option<fwk_module::ConfigData>) -> FwkResult<()> {
        Ok(())
    }

    fn bind(&mut self, _id: FwkId, _round: u32, _fwk: &mut dyn BindPort) -> FwkResult<()> {
        self.ready = true;
        Ok(())
    }

    fn process_bind_request(
        &self,
        _requester_id: FwkId,
        target_id: FwkId,
        api_id: FwkId,
    ) -> FwkResult<ApiRef> {
        if !self.ready || api_id != FwkId::api(target_id.module_idx() as u8, 0) {
            return Err(FwkError::Access);
        }
        Ok(&MATH_API)
    }
}

/// Requests the provider's API, tolerating a denial in round 0
struct Client {
    provider: FwkId,
    acquired: Arc<Mutex<Option<(u32, u32)>>>,
}

impl Client {
    fn entry(provider: FwkId, acquired: &Arc<Mutex<Option<(u32, u32)>>>) -> ModuleEntry {
        let module = Box::leak(Box::new(Client { provider, acquired: acquired.clone() }));
        ModuleEntry::new(module, ModuleConfig::new())
    }
}

impl Module for Client {
    fn name(&self) -> &'static str {
        "client"
    }

    fn kind(&self) -> ModuleKind {
        ModuleKind::Service
    }

    fn init(&mut self, _id: FwkId, _element_count: usize, _data: Option<fwk_module::ConfigData>) -> FwkResult<()> {
        Ok(())
    }

    fn bind(&mut self, _id: FwkId, round: u32, fwk: &mut dyn BindPort) -> FwkResult<()> {
        if self.acquired.lock().unwrap().is_some() {
            return Ok(());
        }

        let api_id = FwkId::api(self.provider.module_idx() as u8, 0);
        match fwk.request_api(self.provider, api_id) {
            Ok(api) => {
                let math = api.downcast_ref::<MathApi>().ok_or(FwkError::Data)?;
                *self.acquired.lock().unwrap() = Some((round, math.add(2, 3)));
                Ok(())
            }
            // The provider registers during this round; try again in the
            // next one.
            Err(FwkError::Access) if round < BIND_ROUND_MAX => Ok(()),
            Err(error) => Err(error),
        }
    }
}

#[test]
fn init_runs_in_declared_order() {
    let trace: Trace = Trace::default();

    let registry = Registry::init([
        Lifecycle::entry(
            &trace,
            ModuleConfig::new()
                .with_data(&MODULE_CFG)
                .with_elements(ElementTable::Static(&ELEMENTS)),
        ),
        Lifecycle::entry(&trace, ModuleConfig::new()),
    ])
    .unwrap();

    assert_eq!(registry.module_count(), 2);
    assert_eq!(
        trace.lock().unwrap().as_slice(),
        &[
            "init [MOD 0] elements=3 data=Some(99)",
            "element_init [ELM 0:0] subs=2 data=Some(10)",
            "element_init [ELM 0:1] subs=0 data=Some(11)",
            "element_init [ELM 0:2] subs=0 data=Some(12)",
            "post_init [MOD 0]",
            "init [MOD 1] elements=0 data=None",
            "post_init [MOD 1]",
        ]
    );
}

#[test]
fn bind_visits_modules_and_elements_each_round() {
    let trace: Trace = Trace::default();

    let mut registry = Registry::init([Lifecycle::entry(
        &trace,
        ModuleConfig::new().with_elements(ElementTable::Static(&ELEMENTS)),
    )])
    .unwrap();
    trace.lock().unwrap().clear();

    registry.bind_all().unwrap();

    assert_eq!(
        trace.lock().unwrap().as_slice(),
        &[
            "bind [MOD 0] round=0",
            "bind [ELM 0:0] round=0",
            "bind [ELM 0:1] round=0",
            "bind [ELM 0:2] round=0",
            "bind [MOD 0] round=1",
            "bind [ELM 0:0] round=1",
            "bind [ELM 0:1] round=1",
            "bind [ELM 0:2] round=1",
        ]
    );
    assert_eq!(registry.state(FwkId::module(0)), Ok(ModuleState::Bound));
    assert_eq!(registry.state(FwkId::element(0, 1)), Ok(ModuleState::Bound));
}

#[test]
fn identifier_validity_follows_the_tables() {
    let trace: Trace = Trace::default();

    let registry = Registry::init([
        Lifecycle::entry(
            &trace,
            ModuleConfig::new().with_elements(ElementTable::Static(&ELEMENTS)),
        ),
        Lifecycle::entry(&trace, ModuleConfig::new()),
    ])
    .unwrap();

    assert!(registry.is_valid_module_id(FwkId::module(0)));
    assert!(registry.is_valid_module_id(FwkId::module(1)));
    assert!(!registry.is_valid_module_id(FwkId::module(2)));
    assert!(!registry.is_valid_module_id(FwkId::element(0, 0)));

    for element in 0..3 {
        assert!(registry.is_valid_element_id(FwkId::element(0, element)));
    }
    assert!(!registry.is_valid_element_id(FwkId::element(0, 3)));
    assert!(!registry.is_valid_element_id(FwkId::element(1, 0)));

    assert!(registry.is_valid_sub_element_id(FwkId::sub_element(0, 0, 1)));
    assert!(!registry.is_valid_sub_element_id(FwkId::sub_element(0, 0, 2)));
    assert!(!registry.is_valid_sub_element_id(FwkId::sub_element(0, 1, 0)));

    assert!(registry.is_valid_entity_id(FwkId::module(1)));
    assert!(registry.is_valid_entity_id(FwkId::element(0, 2)));
    assert!(!registry.is_valid_entity_id(FwkId::None));
    assert!(!registry.is_valid_entity_id(FwkId::api(0, 0)));

    assert_eq!(registry.element_count(FwkId::module(0)), Ok(3));
    assert_eq!(registry.element_count(FwkId::module(1)), Ok(0));
    assert_eq!(registry.element_count(FwkId::module(7)), Err(FwkError::Param));
    assert_eq!(registry.sub_element_count(FwkId::element(0, 0)), Ok(2));

    assert_eq!(registry.name(FwkId::module(0)), Ok("lifecycle"));
    assert_eq!(registry.name(FwkId::element(0, 1)), Ok("e1"));
    assert_eq!(registry.name(FwkId::element(1, 0)), Err(FwkError::Param));

    let data = registry.data(FwkId::element(0, 2)).unwrap().unwrap();
    assert_eq!(data.downcast_ref::<u32>(), Some(&12));
    assert_eq!(registry.data(FwkId::module(1)), Ok(None));
}

#[test]
fn mutual_bind_converges_in_the_second_round() {
    let acquired = Arc::new(Mutex::new(None));

    // The client is declared first, so its round-0 request runs before the
    // provider has registered and must be retried.
    let mut registry = Registry::init([
        Client::entry(FwkId::module(1), &acquired),
        Provider::entry(),
    ])
    .unwrap();
    registry.bind_all().unwrap();

    let (round, sum) = acquired.lock().unwrap().expect("API never acquired");
    assert_eq!(round, 1);
    assert_eq!(sum, 5);

    // The grant is recorded and can be looked up afterwards.
    let api = registry
        .lookup_api(FwkId::module(0), FwkId::module(1), FwkId::api(1, 0))
        .unwrap();
    assert_eq!(api.downcast_ref::<MathApi>().unwrap().add(20, 22), 42);

    // No grant was ever made to the provider itself.
    assert_eq!(
        registry.lookup_api(FwkId::module(1), FwkId::module(1), FwkId::api(1, 0)),
        Err(FwkError::Support)
    );

    // An undeclared API index is a parameter error.
    assert_eq!(
        registry.lookup_api(FwkId::module(0), FwkId::module(1), FwkId::api(1, 1)),
        Err(FwkError::Param)
    );
}

#[test]
fn start_sequencing_updates_states() {
    let trace: Trace = Trace::default();

    let mut registry = Registry::init([Lifecycle::entry(
        &trace,
        ModuleConfig::new().with_elements(ElementTable::Static(&ELEMENTS)),
    )])
    .unwrap();

    // Starting before binding is out of sequence.
    assert_eq!(registry.begin_start(), Err(FwkError::State));

    registry.bind_all().unwrap();
    registry.begin_start().unwrap();
    assert!(!registry.is_running());

    registry.mark_started(0);
    registry.finish_start();

    assert!(registry.is_running());
    assert_eq!(registry.state(FwkId::module(0)), Ok(ModuleState::Started));
    assert_eq!(registry.state(FwkId::element(0, 0)), Ok(ModuleState::Started));
}

#[test]
fn init_failures_propagate() {
    /// A module whose initialization fails
    struct Broken;

    impl Module for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn kind(&self) -> ModuleKind {
            ModuleKind::Driver
        }

        fn init(&mut self, _id: FwkId, _element_count: usize, _data: Option<fwk_module::ConfigData>) -> FwkResult<()> {
            Err(FwkError::Data)
        }
    }

    let broken = Box::leak(Box::new(Broken));
    assert_eq!(
        Registry::init([ModuleEntry::new(broken, ModuleConfig::new())]).err(),
        Some(FwkError::Data)
    );
}

#[test]
fn elements_require_data_and_an_element_init() {
    static BARE_ELEMENT: [ElementDesc; 1] =
        [ElementDesc { name: "bare", sub_element_count: 0, data: None }];

    let trace: Trace = Trace::default();
    let result = Registry::init([Lifecycle::entry(
        &trace,
        ModuleConfig::new().with_elements(ElementTable::Static(&BARE_ELEMENT)),
    )]);
    assert_eq!(result.err(), Some(FwkError::Data));

    /// Declares elements but inherits the default element_init
    struct NoElementInit;

    impl Module for NoElementInit {
        fn name(&self) -> &'static str {
            "no-element-init"
        }

        fn kind(&self) -> ModuleKind {
            ModuleKind::Driver
        }

        fn init(&mut self, _id: FwkId, _element_count: usize, _data: Option<fwk_module::ConfigData>) -> FwkResult<()> {
            Ok(())
        }
    }

    let module = Box::leak(Box::new(NoElementInit));
    let result = Registry::init([ModuleEntry::new(
        module,
        ModuleConfig::new().with_elements(ElementTable::Static(&ELEMENTS)),
    )]);
    assert_eq!(result.err(), Some(FwkError::Support));
}

#[test]
fn element_tables_can_be_generated() {
    fn generate(_id: FwkId) -> &'static [ElementDesc] {
        &ELEMENTS[..2]
    }

    let trace: Trace = Trace::default();
    let registry = Registry::init([Lifecycle::entry(
        &trace,
        ModuleConfig::new().with_elements(ElementTable::Generate(generate)),
    )])
    .unwrap();

    assert_eq!(registry.element_count(FwkId::module(0)), Ok(2));
    assert!(!registry.is_valid_element_id(FwkId::element(0, 2)));
}
