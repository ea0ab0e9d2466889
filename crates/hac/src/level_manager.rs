//! Level managers.
//!
//! A level manager presents one agent together with everything below it as a
//! single environment. The level above acts on it by handing down goals; each
//! goal lets the wrapped agent run for up to `steps_limit` steps on its own
//! lower environment before control returns upward.

use std::cell::Cell;
use std::rc::Rc;

use hac_types::{
    Action, EnvironmentSteps, InputFilter, Observation, OutputFilter, Space, SpacesDefinition,
};
use tracing::debug;

use crate::agent::{Agent, Transition};
use crate::environment::{EnvHandle, EnvResponse, Environment};
use crate::error::ComponentResult;

/// Whether the sub-goal currently handed down from the top is being tested.
///
/// One flag is shared by every level of a graph. The top level writes it once
/// per step; all levels pass it on to their agents.
#[derive(Debug, Clone, Default)]
pub struct SubGoalTesting(Rc<Cell<bool>>);

impl SubGoalTesting {
    pub fn get(&self) -> bool {
        self.0.get()
    }

    pub fn set(&self, testing: bool) {
        self.0.set(testing);
    }
}

/// One level of the hierarchy.
pub struct LevelManager {
    /// Level name, `level_{index}`
    name: String,
    /// Agent acting at this level
    agent: Box<dyn Agent>,
    /// What the agent acts on: the real environment or the level below
    environment: EnvHandle,
    /// Environment at the bottom of the hierarchy
    real_environment: EnvHandle,
    /// Steps per call from the level above
    steps_limit: EnvironmentSteps,
    /// Reset agent state when the budget runs out without the episode ending
    reset_agent_state_after_time_limit: bool,
    input_filter: InputFilter,
    output_filter: OutputFilter,
    /// Spaces of the lower environment, goal space included
    spaces: SpacesDefinition,
    /// Unfiltered observation from the lower environment
    last_observation: Option<Observation>,
    /// Goal currently handed down from above
    goal: Option<Vec<f32>>,
    /// Lower-environment steps taken since construction
    total_steps: u64,
    sub_goal_testing: SubGoalTesting,
    /// Set on the top level, which decides whether sub-goals are tested
    decides_sub_goal_testing: bool,
}

impl std::fmt::Debug for LevelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelManager")
            .field("name", &self.name)
            .field("agent", &self.agent.name())
            .field(
                "environment",
                &self.environment.try_borrow().map(|env| env.name().to_string()).ok(),
            )
            .field("steps_limit", &self.steps_limit)
            .field("reset_agent_state_after_time_limit", &self.reset_agent_state_after_time_limit)
            .field("total_steps", &self.total_steps)
            .finish()
    }
}

impl LevelManager {
    /// Creates a level manager.
    ///
    /// `environment` must already be fully built: its spaces determine the
    /// spaces this level exposes upward.
    pub fn new(
        name: impl Into<String>,
        agent: Box<dyn Agent>,
        environment: EnvHandle,
        real_environment: EnvHandle,
        steps_limit: EnvironmentSteps,
        reset_agent_state_after_time_limit: bool,
    ) -> Self {
        let spaces = environment.borrow().spaces();
        Self {
            name: name.into(),
            agent,
            environment,
            real_environment,
            steps_limit,
            reset_agent_state_after_time_limit,
            input_filter: InputFilter::default(),
            output_filter: OutputFilter::default(),
            spaces,
            last_observation: None,
            goal: None,
            total_steps: 0,
            sub_goal_testing: SubGoalTesting::default(),
            decides_sub_goal_testing: false,
        }
    }

    /// Sets the filters applied between the agent and its lower environment.
    pub fn with_filters(mut self, input_filter: InputFilter, output_filter: OutputFilter) -> Self {
        self.input_filter = input_filter;
        self.output_filter = output_filter;
        self
    }

    /// Attaches the graph-wide sub-goal testing flag. `decides` is true only
    /// for the top level.
    pub fn with_sub_goal_testing(mut self, flag: SubGoalTesting, decides: bool) -> Self {
        self.sub_goal_testing = flag;
        self.decides_sub_goal_testing = decides;
        self
    }

    pub fn sub_goal_testing(&self) -> &SubGoalTesting {
        &self.sub_goal_testing
    }

    pub fn agent(&self) -> &dyn Agent {
        self.agent.as_ref()
    }

    pub fn agent_mut(&mut self) -> &mut dyn Agent {
        self.agent.as_mut()
    }

    pub fn steps_limit(&self) -> EnvironmentSteps {
        self.steps_limit
    }

    pub fn resets_agent_state_after_time_limit(&self) -> bool {
        self.reset_agent_state_after_time_limit
    }

    /// Handle to the environment at the bottom of the hierarchy.
    pub fn real_environment(&self) -> &EnvHandle {
        &self.real_environment
    }

    /// Handle to whatever this level acts on.
    pub fn lower_environment(&self) -> &EnvHandle {
        &self.environment
    }

    /// Spaces the agent at this level works with.
    pub fn agent_spaces(&self) -> &SpacesDefinition {
        &self.spaces
    }

    /// Lower-environment steps taken since construction.
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    pub fn input_filter(&self) -> &InputFilter {
        &self.input_filter
    }

    pub fn output_filter(&self) -> &OutputFilter {
        &self.output_filter
    }

    /// Goal currently being pursued, if any.
    pub fn current_goal(&self) -> Option<&[f32]> {
        self.goal.as_deref()
    }

    /// Runs this level for up to `steps_limit` steps.
    ///
    /// `goal` is None for the top level, which has nobody above it. The
    /// returned observation is the lower environment's raw observation and
    /// the reward is the sum of raw rewards, so each level applies only its
    /// own filters.
    ///
    /// Fails if `goal` does not have the dimension of this level's goal space.
    pub fn step_with_goal(&mut self, goal: Option<&Action>) -> ComponentResult<EnvResponse> {
        if let Some(goal) = goal {
            let goal = self.spaces.goal.clip(goal.as_goal())?;
            self.agent.set_goal(Some(goal.clone()));
            self.goal = Some(goal);
        }

        if self.decides_sub_goal_testing {
            self.sub_goal_testing.set(self.agent.should_test_sub_goal());
        }
        self.agent.set_sub_goal_testing(self.sub_goal_testing.get());

        let mut observation = match self.last_observation.take() {
            Some(observation) => observation,
            None => self.environment.borrow_mut().reset()?,
        };

        let mut reward = 0.0;
        let mut done = false;
        let mut steps = 0;
        while steps < self.steps_limit.get() {
            let agent_observation = self.input_filter.filter_observation(observation.clone());
            let action = self.output_filter.filter_action(self.agent.act(&agent_observation)?);

            let response = self.environment.borrow_mut().step(&action)?;
            steps += 1;
            self.total_steps += 1;

            let filtered_reward = self.input_filter.filter_reward(response.reward);
            self.agent.observe(&Transition {
                observation: agent_observation,
                action,
                reward: filtered_reward,
                next_observation: self.input_filter.filter_observation(response.observation.clone()),
                done: response.done,
                goal: self.goal.clone(),
            })?;

            reward += response.reward;
            observation = response.observation;
            if response.done {
                done = true;
                break;
            }
        }

        if !done && self.reset_agent_state_after_time_limit {
            debug!(level = %self.name, steps, "time limit passed, resetting agent state");
            self.agent.reset_internal_state();
        }

        self.last_observation = Some(observation.clone());
        Ok(EnvResponse { observation, reward, done })
    }
}

impl Environment for LevelManager {
    fn name(&self) -> &str {
        &self.name
    }

    fn observation_space(&self) -> Space {
        self.spaces.observation.clone()
    }

    /// The level above acts on this level by choosing goals.
    fn action_space(&self) -> Space {
        self.spaces.goal.clone()
    }

    fn reset(&mut self) -> ComponentResult<Observation> {
        let observation = self.environment.borrow_mut().reset()?;
        self.agent.reset_internal_state();
        self.agent.set_goal(None);
        self.goal = None;
        self.last_observation = Some(observation.clone());
        Ok(observation)
    }

    fn step(&mut self, action: &Action) -> ComponentResult<EnvResponse> {
        self.step_with_goal(Some(action))
    }

    fn render(&self) -> Option<String> {
        self.real_environment.try_borrow().ok().and_then(|env| env.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::share;
    use std::cell::RefCell;

    /// Counts up by one each step; done once `end` is reached.
    struct Counter {
        position: f32,
        end: f32,
    }

    impl Environment for Counter {
        fn name(&self) -> &str {
            "counter"
        }
        fn observation_space(&self) -> Space {
            Space::Continuous { low: vec![0.0], high: vec![self.end] }
        }
        fn action_space(&self) -> Space {
            Space::Discrete { n: 1 }
        }
        fn reset(&mut self) -> ComponentResult<Observation> {
            self.position = 0.0;
            Ok(vec![self.position])
        }
        fn step(&mut self, _action: &Action) -> ComponentResult<EnvResponse> {
            self.position += 1.0;
            Ok(EnvResponse {
                observation: vec![self.position],
                reward: -1.0,
                done: self.position >= self.end,
            })
        }
    }

    #[derive(Default)]
    struct Probe {
        test_sub_goals: Cell<bool>,
        testing_seen: RefCell<Vec<bool>>,
        acts: Cell<usize>,
        resets: Cell<usize>,
        goal: RefCell<Option<Vec<f32>>>,
        seen: RefCell<Vec<Observation>>,
    }

    struct ProbeAgent(Rc<Probe>);

    impl Agent for ProbeAgent {
        fn name(&self) -> &str {
            "probe"
        }
        fn act(&mut self, observation: &Observation) -> ComponentResult<Action> {
            self.0.acts.set(self.0.acts.get() + 1);
            self.0.seen.borrow_mut().push(observation.clone());
            Ok(Action::Discrete(0))
        }
        fn set_goal(&mut self, goal: Option<Vec<f32>>) {
            *self.0.goal.borrow_mut() = goal;
        }
        fn reset_internal_state(&mut self) {
            self.0.resets.set(self.0.resets.get() + 1);
        }
        fn should_test_sub_goal(&mut self) -> bool {
            self.0.test_sub_goals.get()
        }
        fn set_sub_goal_testing(&mut self, testing: bool) {
            self.0.testing_seen.borrow_mut().push(testing);
        }
    }

    fn counter(end: f32) -> EnvHandle {
        share(Box::new(Counter { position: 0.0, end }))
    }

    #[test]
    fn test_runs_for_step_budget() {
        let env = counter(100.0);
        let probe = Rc::new(Probe::default());
        let mut level = LevelManager::new(
            "level_1",
            Box::new(ProbeAgent(probe.clone())),
            env.clone(),
            env,
            EnvironmentSteps(4),
            true,
        );

        let response = level.step_with_goal(Some(&Action::Continuous(vec![3.0]))).unwrap();
        assert_eq!(probe.acts.get(), 4);
        assert_eq!(response.observation, vec![4.0]);
        assert_eq!(response.reward, -4.0);
        assert!(!response.done);
        assert_eq!(level.total_steps(), 4);
        assert_eq!(*probe.goal.borrow(), Some(vec![3.0]));
    }

    #[test]
    fn test_stops_early_when_done() {
        let env = counter(2.0);
        let probe = Rc::new(Probe::default());
        let mut level = LevelManager::new(
            "level_1",
            Box::new(ProbeAgent(probe.clone())),
            env.clone(),
            env,
            EnvironmentSteps(10),
            true,
        );

        let response = level.step_with_goal(None).unwrap();
        assert!(response.done);
        assert_eq!(probe.acts.get(), 2);
        // The episode ended, so the time limit never elapsed
        assert_eq!(probe.resets.get(), 0);
    }

    #[test]
    fn test_time_limit_resets_agent_state_only_when_enabled() {
        let probe = Rc::new(Probe::default());
        let env = counter(100.0);
        let mut resetting = LevelManager::new(
            "level_1",
            Box::new(ProbeAgent(probe.clone())),
            env.clone(),
            env,
            EnvironmentSteps(3),
            true,
        );
        resetting.step_with_goal(None).unwrap();
        assert_eq!(probe.resets.get(), 1);

        let probe = Rc::new(Probe::default());
        let env = counter(100.0);
        let mut keeping = LevelManager::new(
            "level_0",
            Box::new(ProbeAgent(probe.clone())),
            env.clone(),
            env,
            EnvironmentSteps(3),
            false,
        );
        keeping.step_with_goal(None).unwrap();
        assert_eq!(probe.resets.get(), 0);
    }

    #[test]
    fn test_goal_is_clipped_to_goal_space() {
        let env = counter(5.0);
        let probe = Rc::new(Probe::default());
        let mut level = LevelManager::new(
            "level_1",
            Box::new(ProbeAgent(probe.clone())),
            env.clone(),
            env,
            EnvironmentSteps(1),
            true,
        );
        level.step(&Action::Continuous(vec![42.0])).unwrap();
        assert_eq!(level.current_goal(), Some(&[5.0][..]));
    }

    #[test]
    fn test_spaces_come_from_lower_environment() {
        let env = counter(7.0);
        let level = LevelManager::new(
            "level_1",
            Box::new(ProbeAgent(Rc::new(Probe::default()))),
            env.clone(),
            env,
            EnvironmentSteps(1),
            true,
        );
        let expected = Space::Continuous { low: vec![0.0], high: vec![7.0] };
        assert_eq!(level.observation_space(), expected);
        assert_eq!(level.action_space(), expected);
        assert_eq!(level.agent_spaces().action, Space::Discrete { n: 1 });
    }

    #[test]
    fn test_reset_clears_goal_and_agent_state() {
        let env = counter(100.0);
        let probe = Rc::new(Probe::default());
        let mut level = LevelManager::new(
            "level_1",
            Box::new(ProbeAgent(probe.clone())),
            env.clone(),
            env,
            EnvironmentSteps(2),
            false,
        );
        level.step(&Action::Continuous(vec![1.0])).unwrap();
        let observation = level.reset().unwrap();
        assert_eq!(observation, vec![0.0]);
        assert!(level.current_goal().is_none());
        assert!(probe.goal.borrow().is_none());
        assert_eq!(probe.resets.get(), 1);
    }

    #[test]
    fn test_input_filter_applies_to_agent_not_upward() {
        use hac_types::ObservationFilter;

        let env = counter(100.0);
        let probe = Rc::new(Probe::default());
        let mut level = LevelManager::new(
            "level_1",
            Box::new(ProbeAgent(probe.clone())),
            env.clone(),
            env,
            EnvironmentSteps(2),
            true,
        )
        .with_filters(
            InputFilter {
                observation: vec![ObservationFilter::Scale { factor: 10.0 }],
                reward: vec![],
            },
            OutputFilter::default(),
        );

        let response = level.step_with_goal(None).unwrap();
        assert_eq!(*probe.seen.borrow(), vec![vec![0.0], vec![10.0]]);
        assert_eq!(response.observation, vec![2.0]);
    }

    #[test]
    fn test_goal_of_wrong_dimension_is_rejected() {
        let env = share(Box::new(Counter { position: 0.0, end: 5.0 }));
        let probe = Rc::new(Probe::default());
        let mut level = LevelManager::new(
            "level_1",
            Box::new(ProbeAgent(probe.clone())),
            env.clone(),
            env,
            EnvironmentSteps(2),
            true,
        );

        let err = level.step(&Action::Continuous(vec![1.0, 2.0])).unwrap_err();
        assert_eq!(err.to_string(), "value has 2 dimensions but the space has 1");
        assert_eq!(probe.acts.get(), 0);
        assert!(probe.goal.borrow().is_none());
        assert!(level.current_goal().is_none());
    }

    #[test]
    fn test_sub_goal_testing_flows_from_top_to_lower_level() {
        let env = counter(100.0);
        let bottom_probe = Rc::new(Probe::default());
        let flag = SubGoalTesting::default();
        let bottom = Rc::new(RefCell::new(
            LevelManager::new(
                "level_1",
                Box::new(ProbeAgent(bottom_probe.clone())),
                env.clone(),
                env.clone(),
                EnvironmentSteps(2),
                true,
            )
            .with_sub_goal_testing(flag.clone(), false),
        ));
        let lower: EnvHandle = bottom.clone();

        let top_probe = Rc::new(Probe::default());
        let mut top = LevelManager::new(
            "level_0",
            Box::new(ProbeAgent(top_probe.clone())),
            lower,
            env,
            EnvironmentSteps(1),
            false,
        )
        .with_sub_goal_testing(flag.clone(), true);

        top.step_with_goal(None).unwrap();
        assert!(!flag.get());

        top_probe.test_sub_goals.set(true);
        top.step_with_goal(None).unwrap();
        assert!(flag.get());
        assert!(bottom.borrow().sub_goal_testing().get());

        assert_eq!(*top_probe.testing_seen.borrow(), vec![false, true]);
        assert_eq!(*bottom_probe.testing_seen.borrow(), vec![false, true]);
    }
}
