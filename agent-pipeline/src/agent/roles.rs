//! The closed set of agent roles
//!
//! Every role the pipeline can dispatch to is listed here; routing is a
//! lookup on the stable role name rather than string matching at call sites.
//! Each role carries its capability list, system prompt, and a task-prompt
//! builder that folds in upstream outputs.

use serde_json::Value;
use std::collections::HashMap;

/// One agent role in the delivery pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentRole {
    MarketResearch,
    UiDesigner,
    FrontendEngineer,
    QaEngineer,
}

impl AgentRole {
    /// Stable name used in task assignment, routing, and storage.
    pub fn name(&self) -> &'static str {
        match self {
            AgentRole::MarketResearch => "market-research",
            AgentRole::UiDesigner => "ui-designer",
            AgentRole::FrontendEngineer => "frontend-engineer",
            AgentRole::QaEngineer => "qa-engineer",
        }
    }

    /// Look a role up by its stable name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "market-research" => Some(AgentRole::MarketResearch),
            "ui-designer" => Some(AgentRole::UiDesigner),
            "frontend-engineer" => Some(AgentRole::FrontendEngineer),
            "qa-engineer" => Some(AgentRole::QaEngineer),
            _ => None,
        }
    }

    /// All roles, in pipeline order.
    pub fn all() -> [AgentRole; 4] {
        [
            AgentRole::MarketResearch,
            AgentRole::UiDesigner,
            AgentRole::FrontendEngineer,
            AgentRole::QaEngineer,
        ]
    }

    /// Advisory capability list exposed on the health endpoint.
    pub fn capabilities(&self) -> &'static [&'static str] {
        match self {
            AgentRole::MarketResearch => &[
                "competitor-analysis",
                "best-practices",
                "ux-patterns",
                "trend-analysis",
            ],
            AgentRole::UiDesigner => &[
                "wireframing",
                "component-design",
                "user-flows",
                "accessibility",
                "responsive-design",
            ],
            AgentRole::FrontendEngineer => &[
                "react-development",
                "typescript",
                "tailwind-css",
                "state-management",
                "performance-optimization",
            ],
            AgentRole::QaEngineer => &[
                "test-automation",
                "playwright-testing",
                "accessibility-testing",
                "visual-regression",
                "performance-testing",
            ],
        }
    }

    /// Role system prompt, before workflow/memory context is appended.
    pub fn system_prompt(&self) -> &'static str {
        match self {
            AgentRole::MarketResearch => MARKET_RESEARCH_PROMPT,
            AgentRole::UiDesigner => UI_DESIGNER_PROMPT,
            AgentRole::FrontendEngineer => FRONTEND_ENGINEER_PROMPT,
            AgentRole::QaEngineer => QA_ENGINEER_PROMPT,
        }
    }

    /// Build the role-specific task prompt, folding in truncated digests of
    /// upstream agents' latest outputs.
    pub fn build_task_prompt(
        &self,
        task_type: &str,
        input: &Value,
        previous: &HashMap<String, Value>,
    ) -> String {
        let description = describe_input(input);

        match self {
            AgentRole::MarketResearch => format!(
                "Research Task: {task_type}\n\n\
                 Feature to Research: {description}\n\n\
                 Please research this feature and provide:\n\
                 1. **Competitor Analysis**: How do top 3-5 competitors implement this feature?\n\
                 2. **Best Practices**: What are the industry standards and best practices?\n\
                 3. **UX Patterns**: Common UI/UX patterns for this type of feature\n\
                 4. **Recommendations**: Specific recommendations for our implementation\n\n\
                 Consider:\n\
                 - User experience and accessibility\n\
                 - Performance implications\n\
                 - Mobile vs desktop considerations\n\
                 - Common pitfalls to avoid\n\n\
                 Respond with JSON containing your research findings and recommendations."
            ),
            AgentRole::UiDesigner => {
                let research = digest_section("Research Findings", previous.get("market-research"), 500);
                format!(
                    "Design Task: {task_type}\n\n\
                     Feature to Design: {description}\n\
                     {research}\n\
                     Create a detailed design specification including:\n\
                     1. **Component Structure**: name, purpose, props, hierarchy\n\
                     2. **Visual Design**: layout, spacing, typography, colors, borders\n\
                     3. **Interactions**: click, hover, focus, active states, transitions\n\
                     4. **Responsive Design**: mobile (320-768px), tablet (768-1024px), desktop (1024px+)\n\
                     5. **States**: default, loading, error, empty, success\n\
                     6. **Accessibility**: ARIA labels, keyboard navigation, contrast\n\n\
                     Respond with JSON containing the complete design specification."
                )
            }
            AgentRole::FrontendEngineer => {
                let design = digest_section("Design Specification", previous.get("ui-designer"), 1000);
                format!(
                    "Implementation Task: {task_type}\n\n\
                     Feature to Implement: {description}\n\
                     {design}\n\
                     Generate production-ready React code including:\n\
                     1. **Component Code**: implementation, imports, types, state, handlers, a11y\n\
                     2. **Styling**: Tailwind utility classes, responsive variants, no custom CSS\n\
                     3. **Code Quality**: error handling, loading states, readable naming\n\
                     4. **File Structure**: component file, helpers, constants\n\n\
                     Respond with JSON containing:\n\
                     - \"code\": the complete component code as a string\n\
                     - \"filename\": suggested filename\n\
                     - \"dependencies\": any npm packages needed\n\
                     - \"usage_example\": example of how to use the component\n\
                     - \"notes\": implementation notes or considerations"
                )
            }
            AgentRole::QaEngineer => {
                let code = digest_section("Component Implementation", previous.get("frontend-engineer"), 800);
                let design = digest_section("Design Specification", previous.get("ui-designer"), 500);
                format!(
                    "Testing Task: {task_type}\n\n\
                     Feature to Test: {description}\n\
                     {code}{design}\n\
                     Generate a comprehensive test suite including:\n\
                     1. **Playwright E2E Tests**: user flows, interactions, validation, errors\n\
                     2. **Accessibility Tests**: ARIA, keyboard navigation, contrast, focus\n\
                     3. **Responsive Tests**: 375px, 768px, and 1440px viewports\n\
                     4. **Performance Tests**: render time, network requests, bundle impact\n\
                     5. **Test Cases**: descriptions, expected behavior, edge cases, assertions\n\n\
                     Respond with JSON containing:\n\
                     - \"test_code\": complete Playwright test script\n\
                     - \"filename\": suggested test filename\n\
                     - \"test_cases\": list of test case descriptions\n\
                     - \"coverage\": estimated coverage percentage\n\
                     - \"notes\": testing considerations or known limitations"
                )
            }
        }
    }
}

/// Prefer a `description` field; fall back to the serialized input.
fn describe_input(input: &Value) -> String {
    match input.get("description").and_then(Value::as_str) {
        Some(description) => description.to_string(),
        None => match input {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    }
}

/// Render an optional upstream output as a bounded prompt section.
fn digest_section(label: &str, value: Option<&Value>, limit: usize) -> String {
    match value {
        Some(value) => {
            let serialized = value.to_string();
            let truncated: String = serialized.chars().take(limit).collect();
            let suffix = if serialized.chars().count() > limit { "..." } else { "" };
            format!("\n{label}: {truncated}{suffix}\n")
        }
        None => "\n".to_string(),
    }
}

const MARKET_RESEARCH_PROMPT: &str = "\
You are the Market Research Agent for a feature-delivery pipeline.

Your role is to:
- Research competitor products and similar features
- Identify industry best practices
- Gather UX patterns and examples
- Provide data-driven recommendations

When analyzing a feature request:
1. Search for similar implementations in popular products
2. Identify what works well and what doesn't
3. Consider accessibility, performance, and user experience
4. Provide specific, actionable recommendations

Always cite sources when possible and be specific about findings.";

const UI_DESIGNER_PROMPT: &str = "\
You are the UI/UX Designer Agent for a feature-delivery pipeline.

Your role is to:
- Create detailed component specifications
- Design user flows and interactions
- Ensure accessibility (WCAG 2.1 AA compliance)
- Design responsive layouts for mobile/tablet/desktop
- Maintain consistency with the design system

Design Principles:
- Simple and intuitive
- Accessible to all users
- Mobile-first approach
- Consistent with modern web standards
- Performance-conscious (avoid heavy animations)

When designing, consider:
- Component hierarchy and composition
- State management (loading, error, success, empty states)
- Responsive breakpoints (mobile: 320-768px, tablet: 768-1024px, desktop: 1024px+)
- Color contrast ratios (minimum 4.5:1 for text)
- Keyboard navigation and screen reader support";

const FRONTEND_ENGINEER_PROMPT: &str = "\
You are the Frontend Engineer Agent for a feature-delivery pipeline.

Your role is to:
- Implement React components from design specifications
- Write clean, maintainable TypeScript/JavaScript code
- Use Tailwind CSS for styling (utility classes only)
- Implement proper state management
- Follow React best practices and hooks conventions

Coding Standards:
- Use functional components with hooks
- PropTypes or TypeScript for type safety
- Semantic HTML elements
- Accessible components (ARIA attributes)
- No inline styles (use Tailwind classes)
- Extract reusable logic into custom hooks
- Handle loading, error, and edge cases

Performance:
- Avoid unnecessary re-renders
- Use React.memo when appropriate
- Code split large components
- Optimize images and assets";

const QA_ENGINEER_PROMPT: &str = "\
You are the QA Engineer Agent for a feature-delivery pipeline.

Your role is to:
- Generate comprehensive test cases
- Create Playwright test scripts
- Test accessibility compliance
- Verify responsive design
- Check performance metrics

Testing Strategy:
- Unit tests for component logic
- Integration tests for user flows
- Accessibility tests (WCAG 2.1 AA)
- Visual regression tests
- Performance tests

Quality Standards:
- Tests should be deterministic (no flaky tests)
- Clear test descriptions
- Proper setup and teardown
- Use test IDs for reliable selectors
- Assert on user-visible behavior, not implementation details";
