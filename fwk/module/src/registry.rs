//! Module and element registry

use heapless::Vec;

use fwk_core::{fwk_log_error, FwkError, FwkId, FwkResult};

use crate::{
    ApiRef, BindPort, ConfigData, ElementDesc, ElementTable, Module, ModuleEntry, ModuleKind,
    ModuleState, BIND_ROUND_MAX, ELEMENT_COUNT_MAX, GRANTED_API_COUNT_MAX, MODULE_COUNT_MAX,
};

/// Pre-runtime phase the registry is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stage {
    Initialize,
    Bind,
    Start,
    Running,
}

struct ElementCtx {
    desc: &'static ElementDesc,
    state: ModuleState,
}

struct GrantedApi {
    requester: u8,
    api: u8,
    api_ref: ApiRef,
}

struct ModuleCtx {
    /// The module itself. Temporarily vacated while one of its callbacks
    /// runs, so a callback can be handed framework services without
    /// aliasing its own context.
    slot: Option<&'static mut dyn Module>,
    id: FwkId,
    name: &'static str,
    kind: ModuleKind,
    api_count: usize,
    event_count: usize,
    notification_count: usize,
    state: ModuleState,
    data: Option<ConfigData>,
    elements: Vec<ElementCtx, ELEMENT_COUNT_MAX>,
    granted: Vec<GrantedApi, GRANTED_API_COUNT_MAX>,
}

/// Registry of every configured module and its elements.
///
/// Single-owner: the registry is constructed from the static module table
/// and handed to the runtime; there is no global state. Module indices are
/// assigned from table order.
pub struct Registry {
    modules: Vec<ModuleCtx, MODULE_COUNT_MAX>,
    stage: Stage,
}

impl Registry {
    /// Initialize every module in declared order.
    ///
    /// Per module: `init` with the element count and module data, then
    /// `element_init` per element, then `post_init`. Any callback error is
    /// returned and must be treated as fatal by the caller: a
    /// half-initialized table makes every later operation undefined.
    pub fn init(entries: impl IntoIterator<Item = ModuleEntry>) -> FwkResult<Self> {
        let mut registry = Registry { modules: Vec::new(), stage: Stage::Initialize };

        for entry in entries {
            registry.init_module(entry)?;
        }

        Ok(registry)
    }

    fn init_module(&mut self, entry: ModuleEntry) -> FwkResult<()> {
        let index = self.modules.len();
        if index >= MODULE_COUNT_MAX {
            fwk_log_error!("[MOD] module table exhausted");
            return Err(FwkError::Nomem);
        }

        let ModuleEntry { module, config } = entry;
        let id = FwkId::module(index as u8);

        if module.name().is_empty() {
            fwk_log_error!("[MOD] module {} has no name", id);
            return Err(FwkError::Param);
        }

        let element_table: &'static [ElementDesc] = match config.elements {
            ElementTable::None => &[],
            ElementTable::Static(table) => table,
            ElementTable::Generate(generate) => generate(id),
        };
        if element_table.len() > ELEMENT_COUNT_MAX {
            fwk_log_error!("[MOD] element table of {} exhausted", id);
            return Err(FwkError::Nomem);
        }

        module.init(id, element_table.len(), config.data)?;

        let mut elements: Vec<ElementCtx, ELEMENT_COUNT_MAX> = Vec::new();
        for (element_idx, desc) in element_table.iter().enumerate() {
            // Each element must carry element-specific data.
            if desc.data.is_none() {
                fwk_log_error!("[MOD] element {}:{} has no data", id, element_idx);
                return Err(FwkError::Data);
            }

            let element_id = FwkId::element(index as u8, element_idx as u16);
            module.element_init(element_id, desc.sub_element_count, desc.data)?;

            let _ = elements.push(ElementCtx { desc, state: ModuleState::Initialized });
        }

        module.post_init(id)?;

        let _ = self.modules.push(ModuleCtx {
            id,
            name: module.name(),
            kind: module.kind(),
            api_count: module.api_count(),
            event_count: module.event_count(),
            notification_count: module.notification_count(),
            state: ModuleState::Initialized,
            data: config.data,
            elements,
            granted: Vec::new(),
            slot: Some(module),
        });
        Ok(())
    }

    /// Run the bind phase: rounds `0..=BIND_ROUND_MAX`, each calling every
    /// module's and element's `bind` callback in declared order.
    ///
    /// Binding must converge within the round bound; a `bind` callback
    /// error is returned and must be treated as a fatal configuration
    /// error by the caller.
    pub fn bind_all(&mut self) -> FwkResult<()> {
        if self.stage != Stage::Initialize {
            return Err(FwkError::State);
        }
        self.stage = Stage::Bind;

        for round in 0..=BIND_ROUND_MAX {
            for index in 0..self.modules.len() {
                self.bind_module(index, round)?;
            }
        }
        Ok(())
    }

    fn bind_module(&mut self, index: usize, round: u32) -> FwkResult<()> {
        let Some(module) = self.modules[index].slot.take() else {
            return Err(FwkError::State);
        };
        let module_id = self.modules[index].id;
        let element_count = self.modules[index].elements.len();

        let mut result =
            module.bind(module_id, round, &mut Binder { registry: self, requester: module_id });

        for element_idx in 0..element_count {
            if result.is_err() {
                break;
            }
            let element_id = FwkId::element(index as u8, element_idx as u16);
            result =
                module.bind(element_id, round, &mut Binder { registry: self, requester: element_id });
        }

        self.modules[index].slot = Some(module);

        if let Err(error) = result {
            fwk_log_error!("[MOD] bind of {} failed in round {}: {}", module_id, round, error);
            return Err(error);
        }

        if round == BIND_ROUND_MAX {
            let ctx = &mut self.modules[index];
            ctx.state = ModuleState::Bound;
            for element in ctx.elements.iter_mut() {
                element.state = ModuleState::Bound;
            }
        }
        Ok(())
    }

    /// Enter the start phase. Start callbacks themselves are driven by the
    /// runtime, which can hand them framework services.
    pub fn begin_start(&mut self) -> FwkResult<()> {
        if self.stage != Stage::Bind {
            return Err(FwkError::State);
        }
        self.stage = Stage::Start;
        Ok(())
    }

    /// Record that a module and its elements have started
    pub fn mark_started(&mut self, index: usize) {
        if let Some(ctx) = self.modules.get_mut(index) {
            ctx.state = ModuleState::Started;
            for element in ctx.elements.iter_mut() {
                element.state = ModuleState::Started;
            }
        }
    }

    /// Leave the start phase; the registry is now running
    pub fn finish_start(&mut self) {
        self.stage = Stage::Running;
    }

    /// Current pre-runtime stage
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Check whether the start phase completed
    pub fn is_running(&self) -> bool {
        self.stage == Stage::Running
    }

    /// Number of configured modules
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Temporarily vacate a module's slot to invoke one of its callbacks
    pub fn take_module(&mut self, index: usize) -> Option<&'static mut dyn Module> {
        self.modules.get_mut(index)?.slot.take()
    }

    /// Return a module to its slot after a callback completed
    pub fn restore_module(&mut self, index: usize, module: &'static mut dyn Module) {
        if let Some(ctx) = self.modules.get_mut(index) {
            ctx.slot = Some(module);
        }
    }

    /// Check a module identifier against the table bounds
    pub fn is_valid_module_id(&self, id: FwkId) -> bool {
        match id {
            FwkId::Module { module } => (module as usize) < self.modules.len(),
            _ => false,
        }
    }

    /// Check an element identifier against the table bounds
    pub fn is_valid_element_id(&self, id: FwkId) -> bool {
        match id {
            FwkId::Element { module, element } => self
                .modules
                .get(module as usize)
                .is_some_and(|ctx| (element as usize) < ctx.elements.len()),
            _ => false,
        }
    }

    /// Check a sub-element identifier against the table bounds
    pub fn is_valid_sub_element_id(&self, id: FwkId) -> bool {
        match id {
            FwkId::SubElement { module, element, sub_element } => self
                .modules
                .get(module as usize)
                .and_then(|ctx| ctx.elements.get(element as usize))
                .is_some_and(|element| (sub_element as usize) < element.desc.sub_element_count),
            _ => false,
        }
    }

    /// Check whether an identifier names a live module, element or
    /// sub-element
    pub fn is_valid_entity_id(&self, id: FwkId) -> bool {
        match id {
            FwkId::Module { .. } => self.is_valid_module_id(id),
            FwkId::Element { .. } => self.is_valid_element_id(id),
            FwkId::SubElement { .. } => self.is_valid_sub_element_id(id),
            _ => false,
        }
    }

    /// Check an API identifier against the owning module's declared count
    pub fn is_valid_api_id(&self, id: FwkId) -> bool {
        match id {
            FwkId::Api { module, api } => self
                .modules
                .get(module as usize)
                .is_some_and(|ctx| (api as usize) < ctx.api_count),
            _ => false,
        }
    }

    /// Check an event type identifier against the owning module's declared
    /// count
    pub fn is_valid_event_id(&self, id: FwkId) -> bool {
        match id {
            FwkId::Event { module, event } => self
                .modules
                .get(module as usize)
                .is_some_and(|ctx| (event as usize) < ctx.event_count),
            _ => false,
        }
    }

    /// Check a notification type identifier against the owning module's
    /// declared count
    pub fn is_valid_notification_id(&self, id: FwkId) -> bool {
        match id {
            FwkId::Notification { module, notification } => self
                .modules
                .get(module as usize)
                .is_some_and(|ctx| (notification as usize) < ctx.notification_count),
            _ => false,
        }
    }

    /// Number of elements owned by a module
    pub fn element_count(&self, id: FwkId) -> FwkResult<usize> {
        if !self.is_valid_module_id(id) {
            return Err(FwkError::Param);
        }
        Ok(self.modules[id.module_idx()].elements.len())
    }

    /// Number of sub-elements owned by an element
    pub fn sub_element_count(&self, element_id: FwkId) -> FwkResult<usize> {
        if !self.is_valid_element_id(element_id) {
            return Err(FwkError::Param);
        }
        let ctx = &self.modules[element_id.module_idx()];
        Ok(ctx.elements[element_id.element_idx()].desc.sub_element_count)
    }

    /// Name of a module or element
    pub fn name(&self, id: FwkId) -> FwkResult<&'static str> {
        if self.is_valid_element_id(id) {
            let ctx = &self.modules[id.module_idx()];
            Ok(ctx.elements[id.element_idx()].desc.name)
        } else if self.is_valid_module_id(id) {
            Ok(self.modules[id.module_idx()].name)
        } else {
            Err(FwkError::Param)
        }
    }

    /// Category of a module
    pub fn kind(&self, id: FwkId) -> FwkResult<ModuleKind> {
        if !self.is_valid_module_id(id) {
            return Err(FwkError::Param);
        }
        Ok(self.modules[id.module_idx()].kind)
    }

    /// Configuration data attached to a module, element or sub-element
    pub fn data(&self, id: FwkId) -> FwkResult<Option<ConfigData>> {
        if self.is_valid_element_id(id) || self.is_valid_sub_element_id(id) {
            let ctx = &self.modules[id.module_idx()];
            Ok(ctx.elements[id.element_idx()].desc.data)
        } else if self.is_valid_module_id(id) {
            Ok(self.modules[id.module_idx()].data)
        } else {
            Err(FwkError::Param)
        }
    }

    /// Lifecycle state of a module or element
    pub fn state(&self, id: FwkId) -> FwkResult<ModuleState> {
        if self.is_valid_element_id(id) || self.is_valid_sub_element_id(id) {
            Ok(self.modules[id.module_idx()].elements[id.element_idx()].state)
        } else if self.is_valid_module_id(id) {
            Ok(self.modules[id.module_idx()].state)
        } else {
            Err(FwkError::Param)
        }
    }

    /// Look up an API granted to a requester during binding.
    ///
    /// Fails with `Support` if no such grant was ever recorded.
    pub fn lookup_api(
        &self,
        requester_id: FwkId,
        target_id: FwkId,
        api_id: FwkId,
    ) -> FwkResult<ApiRef> {
        if !self.is_valid_entity_id(requester_id)
            || !self.is_valid_entity_id(target_id)
            || !self.is_valid_api_id(api_id)
            || api_id.module_idx() != target_id.module_idx()
        {
            return Err(FwkError::Param);
        }

        let requester = requester_id.module_idx() as u8;
        let api = api_id.api_idx() as u8;
        self.modules[target_id.module_idx()]
            .granted
            .iter()
            .find(|grant| grant.requester == requester && grant.api == api)
            .map(|grant| grant.api_ref)
            .ok_or(FwkError::Support)
    }
}

/// Bind-phase services handed to `Module::bind`
pub struct Binder<'a> {
    registry: &'a mut Registry,
    requester: FwkId,
}

impl BindPort for Binder<'_> {
    fn request_api(&mut self, target_id: FwkId, api_id: FwkId) -> FwkResult<ApiRef> {
        let registry = &mut *self.registry;

        if !registry.is_valid_entity_id(target_id)
            || !registry.is_valid_api_id(api_id)
            || api_id.module_idx() != target_id.module_idx()
        {
            fwk_log_error!("[MOD] invalid bind request {} -> {}", self.requester, api_id);
            return Err(FwkError::Param);
        }

        let target_index = target_id.module_idx();
        let api_ref = {
            // The slot is vacant only for the module currently binding.
            let Some(target) = registry.modules[target_index].slot.as_deref() else {
                fwk_log_error!("[MOD] {} requested an API from itself", self.requester);
                return Err(FwkError::Busy);
            };
            target.process_bind_request(self.requester, target_id, api_id)?
        };

        let requester = self.requester.module_idx() as u8;
        let api = api_id.api_idx() as u8;
        let granted = &mut registry.modules[target_index].granted;
        let already_recorded =
            granted.iter().any(|grant| grant.requester == requester && grant.api == api);
        if !already_recorded
            && granted.push(GrantedApi { requester, api, api_ref }).is_err()
        {
            fwk_log_error!("[MOD] grant table of {} exhausted", target_id);
            return Err(FwkError::Nomem);
        }

        Ok(api_ref)
    }

    fn element_count(&self, id: FwkId) -> FwkResult<usize> {
        self.registry.element_count(id)
    }

    fn config_data(&self, id: FwkId) -> FwkResult<Option<ConfigData>> {
        self.registry.data(id)
    }
}
