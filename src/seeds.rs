//! Built-in problem catalog, available without any config or state files.

use tracing::error;

use crate::domain::{Category, Difficulty, Problem, ProblemSource, StarterCode, TestCase};
use crate::predicate::Predicate;

/// Compile one seed predicate. A seed that fails to compile is a bug in this
/// file; we log it and drop the case rather than refuse to boot.
fn tc(id: u32, description: &str, predicate: &str) -> Option<TestCase> {
  match Predicate::compile(predicate) {
    Ok(p) => Some(TestCase::new(id, description.to_string(), p)),
    Err(e) => {
      error!(target: "problem", id, %e, "seed predicate failed to compile, skipping case");
      None
    }
  }
}

pub fn seed_problems() -> Vec<Problem> {
  vec![
    Problem {
      id: "sum-two-numbers".into(),
      title: "Sum Two Numbers".into(),
      description: "Write a function `add` that takes two numbers and returns their sum.".into(),
      difficulty: Difficulty::Easy,
      category: Category::Dsa,
      starter_code: StarterCode {
        javascript: "function add(a, b) {\n  // Your code here\n}\n".into(),
        typescript: "function add(a: number, b: number): number {\n  // Your code here\n}\n".into(),
      },
      exposes: vec!["add".into()],
      test_cases: [
        tc(1, "adds two positive numbers", "() => add(2, 3) === 5"),
        tc(2, "adds two negative numbers", "() => add(-10, -20) === -30"),
        tc(3, "adds zero", "() => add(0, 0) === 0"),
        tc(4, "adds a positive and a negative number", "() => add(7, -3) === 4"),
        tc(5, "adds decimal numbers", "() => add(0.5, 0.25) === 0.75"),
      ]
      .into_iter()
      .flatten()
      .collect(),
      source: ProblemSource::Seed,
    },
    Problem {
      id: "reverse-string".into(),
      title: "Reverse a String".into(),
      description: "Write a function `reverseString` that returns its input string reversed."
        .into(),
      difficulty: Difficulty::Easy,
      category: Category::JavaScript,
      starter_code: StarterCode {
        javascript: "function reverseString(str) {\n  // Your code here\n}\n".into(),
        typescript: "function reverseString(str: string): string {\n  // Your code here\n}\n"
          .into(),
      },
      exposes: vec!["reverseString".into()],
      test_cases: [
        tc(1, "reverses a simple word", "() => reverseString('hello') === 'olleh'"),
        tc(2, "reverses a sentence", "() => reverseString('a b c') === 'c b a'"),
        tc(3, "handles the empty string", "() => reverseString('') === ''"),
      ]
      .into_iter()
      .flatten()
      .collect(),
      source: ProblemSource::Seed,
    },
    Problem {
      id: "fibonacci-sequence".into(),
      title: "Fibonacci Sequence".into(),
      description:
        "Write a function `fibonacci` that returns the n-th Fibonacci number, with fibonacci(0) = 0 and fibonacci(1) = 1."
          .into(),
      difficulty: Difficulty::Medium,
      category: Category::Dsa,
      starter_code: StarterCode {
        javascript: "function fibonacci(n) {\n  // Your code here\n}\n".into(),
        typescript: "function fibonacci(n: number): number {\n  // Your code here\n}\n".into(),
      },
      exposes: vec!["fibonacci".into()],
      test_cases: [
        tc(1, "fibonacci of 0 is 0", "() => fibonacci(0) === 0"),
        tc(2, "fibonacci of 1 is 1", "() => fibonacci(1) === 1"),
        tc(3, "fibonacci of 5 is 5", "() => fibonacci(5) === 5"),
        tc(4, "fibonacci of 10 is 55", "() => fibonacci(10) === 55"),
      ]
      .into_iter()
      .flatten()
      .collect(),
      source: ProblemSource::Seed,
    },
    Problem {
      id: "find-max".into(),
      title: "Find the Maximum".into(),
      description:
        "Write a function `findMax` that returns the largest number in a non-empty array.".into(),
      difficulty: Difficulty::Easy,
      category: Category::Dsa,
      starter_code: StarterCode {
        javascript: "function findMax(numbers) {\n  // Your code here\n}\n".into(),
        typescript: "function findMax(numbers: number[]): number {\n  // Your code here\n}\n"
          .into(),
      },
      exposes: vec!["findMax".into()],
      test_cases: [
        tc(1, "finds the max of positives", "() => findMax([1, 9, 4]) === 9"),
        tc(2, "finds the max of negatives", "() => findMax([-5, -2, -8]) === -2"),
        tc(3, "handles a single element", "() => findMax([42]) === 42"),
        tc(4, "handles the max at the front", "() => findMax([10, 3, 7]) === 10"),
      ]
      .into_iter()
      .flatten()
      .collect(),
      source: ProblemSource::Seed,
    },
    Problem {
      id: "is-palindrome".into(),
      title: "Palindrome Check".into(),
      description:
        "Write a function `isPalindrome` that returns true when its input string reads the same forwards and backwards."
          .into(),
      difficulty: Difficulty::Medium,
      category: Category::JavaScript,
      starter_code: StarterCode {
        javascript: "function isPalindrome(str) {\n  // Your code here\n}\n".into(),
        typescript: "function isPalindrome(str: string): boolean {\n  // Your code here\n}\n"
          .into(),
      },
      exposes: vec!["isPalindrome".into()],
      test_cases: [
        tc(1, "recognizes a palindrome", "() => isPalindrome('racecar') === true"),
        tc(2, "rejects a non-palindrome", "() => isPalindrome('hello') === false"),
        tc(3, "the empty string is a palindrome", "() => isPalindrome('') === true"),
        tc(4, "single characters are palindromes", "() => isPalindrome('x') === true"),
      ]
      .into_iter()
      .flatten()
      .collect(),
      source: ProblemSource::Seed,
    },
    Problem {
      id: "center-div".into(),
      title: "Center a Div".into(),
      description:
        "Write a function `getCenterStyles` that returns a CSS declaration string which centers a div, using flexbox or grid."
          .into(),
      difficulty: Difficulty::Easy,
      category: Category::Css,
      starter_code: StarterCode {
        javascript: "function getCenterStyles() {\n  // Return the CSS declarations as a string\n}\n".into(),
        typescript: "function getCenterStyles(): string {\n  // Return the CSS declarations as a string\n}\n".into(),
      },
      exposes: vec!["getCenterStyles".into()],
      test_cases: [
        tc(
          1,
          "uses flexbox or grid",
          "() => getCenterStyles().includes('display') && (getCenterStyles().includes('flex') || getCenterStyles().includes('grid'))",
        ),
        tc(
          2,
          "centers the content",
          "() => getCenterStyles().includes('center') || getCenterStyles().includes('justify') || getCenterStyles().includes('align')",
        ),
      ]
      .into_iter()
      .flatten()
      .collect(),
      source: ProblemSource::Seed,
    },
    Problem {
      id: "semantic-html".into(),
      title: "Semantic Blog Post".into(),
      description:
        "Write a function `createBlogHTML` that takes a title and content and returns a blog post built from semantic HTML elements."
          .into(),
      difficulty: Difficulty::Easy,
      category: Category::Html,
      starter_code: StarterCode {
        javascript: "function createBlogHTML(title, content) {\n  // Your code here\n}\n".into(),
        typescript:
          "function createBlogHTML(title: string, content: string): string {\n  // Your code here\n}\n"
            .into(),
      },
      exposes: vec!["createBlogHTML".into()],
      test_cases: [
        tc(
          1,
          "wraps the post in an article element",
          "() => createBlogHTML('Title', 'Body').includes('<article>') || createBlogHTML('Title', 'Body').includes('<article ')",
        ),
        tc(
          2,
          "includes header and main sections",
          "() => createBlogHTML('Title', 'Body').includes('<header>') && createBlogHTML('Title', 'Body').includes('<main>')",
        ),
      ]
      .into_iter()
      .flatten()
      .collect(),
      source: ProblemSource::Seed,
    },
    Problem {
      id: "useeffect-cleanup".into(),
      title: "useEffect Cleanup".into(),
      description:
        "Write a function `describeCleanup` that returns a short explanation of when a useEffect cleanup function runs and why it matters."
          .into(),
      difficulty: Difficulty::Medium,
      category: Category::React,
      starter_code: StarterCode {
        javascript: "function describeCleanup() {\n  // Return your explanation as a string\n}\n".into(),
        typescript: "function describeCleanup(): string {\n  // Return your explanation as a string\n}\n".into(),
      },
      exposes: vec!["describeCleanup".into()],
      test_cases: [
        tc(1, "mentions cleanup", "() => describeCleanup().toLowerCase().includes('cleanup')"),
        tc(2, "gives a substantive answer", "() => describeCleanup().length > 10"),
      ]
      .into_iter()
      .flatten()
      .collect(),
      source: ProblemSource::Seed,
    },
    Problem {
      id: "binary-search".into(),
      title: "Binary Search".into(),
      description:
        "Write a function `binarySearch` that returns the index of a target in a sorted array, or -1 when the target is absent."
          .into(),
      difficulty: Difficulty::Hard,
      category: Category::Dsa,
      starter_code: StarterCode {
        javascript: "function binarySearch(arr, target) {\n  // Your code here\n  return -1;\n}\n".into(),
        typescript:
          "function binarySearch(arr: number[], target: number): number {\n  // Your code here\n  return -1;\n}\n"
            .into(),
      },
      exposes: vec!["binarySearch".into()],
      test_cases: [
        tc(1, "finds an element in the middle", "() => binarySearch([1, 2, 3, 4, 5], 3) === 2"),
        tc(2, "returns -1 for a missing element", "() => binarySearch([1, 2, 3, 4, 5], 6) === -1"),
        tc(3, "finds the first element", "() => binarySearch([1, 2, 3, 4, 5], 1) === 0"),
      ]
      .into_iter()
      .flatten()
      .collect(),
      source: ProblemSource::Seed,
    },
  ]
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  #[test]
  fn seed_ids_are_unique_and_nonempty() {
    let problems = seed_problems();
    let ids: HashSet<&str> = problems.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids.len(), problems.len());
    assert!(ids.iter().all(|id| !id.is_empty()));
  }

  #[test]
  fn every_seed_has_tests_and_starter_code() {
    for p in seed_problems() {
      assert!(!p.test_cases.is_empty(), "{} has no test cases", p.id);
      assert!(!p.starter_code.javascript.is_empty(), "{} missing js starter", p.id);
      assert!(!p.starter_code.typescript.is_empty(), "{} missing ts starter", p.id);
      assert!(!p.exposes.is_empty(), "{} exposes nothing", p.id);
      assert_eq!(p.source, ProblemSource::Seed);
    }
  }

  #[test]
  fn seeds_are_not_editable() {
    assert!(seed_problems().iter().all(|p| !p.editable()));
  }

  #[test]
  fn case_ids_are_sequential_per_problem() {
    for p in seed_problems() {
      for (i, case) in p.test_cases.iter().enumerate() {
        assert_eq!(case.id as usize, i + 1, "{}", p.id);
      }
    }
  }

  #[test]
  fn catalog_spans_difficulties_and_categories() {
    let problems = seed_problems();
    for d in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
      assert!(problems.iter().any(|p| p.difficulty == d), "no {d:?} problem");
    }
    for c in [Category::Dsa, Category::JavaScript, Category::Css, Category::Html, Category::React] {
      assert!(problems.iter().any(|p| p.category == c), "no {c:?} problem");
    }
  }

  #[test]
  fn fibonacci_seed_is_solvable() {
    use crate::engine::Engine;
    let problems = seed_problems();
    let p = problems.iter().find(|p| p.id == "fibonacci-sequence").expect("seed");
    let solution =
      "function fibonacci(n) { if (n <= 1) { return n; } return fibonacci(n - 1) + fibonacci(n - 2); }";
    let result = Engine::new().run(solution, &p.test_cases, &p.exposes);
    assert!(result.all_passed);
  }

  #[test]
  fn binary_search_seed_is_solvable() {
    use crate::engine::Engine;
    let problems = seed_problems();
    let p = problems.iter().find(|p| p.id == "binary-search").expect("seed");
    let solution = "function binarySearch(arr, target) {\n      let lo = 0;\n      let hi = arr.length - 1;\n      while (lo <= hi) {\n        const mid = Math.floor((lo + hi) / 2);\n        if (arr[mid] === target) { return mid; }\n        if (arr[mid] < target) { lo = mid + 1; } else { hi = mid - 1; }\n      }\n      return -1;\n    }";
    let result = Engine::new().run(solution, &p.test_cases, &p.exposes);
    assert!(result.all_passed);
  }

  #[test]
  fn string_inspection_seeds_accept_a_straightforward_answer() {
    use crate::engine::Engine;
    let problems = seed_problems();

    let p = problems.iter().find(|p| p.id == "semantic-html").expect("seed");
    let solution = "function createBlogHTML(title, content) {\n      return '<article><header>' + title + '</header><main>' + content + '</main></article>';\n    }";
    let result = Engine::new().run(solution, &p.test_cases, &p.exposes);
    assert!(result.all_passed);

    let p = problems.iter().find(|p| p.id == "center-div").expect("seed");
    let solution =
      "function getCenterStyles() { return 'display: flex; justify-content: center; align-items: center;'; }";
    let result = Engine::new().run(solution, &p.test_cases, &p.exposes);
    assert!(result.all_passed);

    let p = problems.iter().find(|p| p.id == "useeffect-cleanup").expect("seed");
    let solution =
      "function describeCleanup() { return 'The cleanup runs before the next effect and on unmount.'; }";
    let result = Engine::new().run(solution, &p.test_cases, &p.exposes);
    assert!(result.all_passed);
  }
}
